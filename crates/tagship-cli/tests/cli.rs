//! End-to-end tests running the tagship binary against scratch repositories

use std::path::Path;
use std::process::{Command, Output};

use git2::{IndexAddOption, Oid, Repository, Signature, Time};
use tempfile::TempDir;

/// A temporary git repository the binary is pointed at with `-C`
struct TestContext {
    temp_dir: TempDir,
    repo: Repository,
}

impl TestContext {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let repo = Repository::init(temp_dir.path()).expect("failed to init repo");
        Self { temp_dir, repo }
    }

    fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    fn commit(&self, name: &str, time: i64) -> Oid {
        std::fs::write(self.path().join(format!("{name}.txt")), name).unwrap();
        let mut index = self.repo.index().unwrap();
        index
            .add_all(["*"], IndexAddOption::DEFAULT, None)
            .unwrap();
        index.write().unwrap();
        let tree = self.repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = Signature::new("Tagship Test", "test@tagship.invalid", &Time::new(time, 0))
            .unwrap();
        let parent = self.repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<_> = parent.iter().collect();
        self.repo
            .commit(Some("HEAD"), &sig, &sig, name, &tree, &parents)
            .unwrap()
    }

    fn tag(&self, name: &str, target: Oid) {
        let object = self.repo.find_object(target, None).unwrap();
        let sig = Signature::new("Tagship Test", "test@tagship.invalid", &Time::new(0, 0))
            .unwrap();
        self.repo.tag(name, &object, &sig, name, false).unwrap();
    }

    fn command(&self, args: &[&str]) -> Command {
        let bin_path = env!("CARGO_BIN_EXE_tagship");
        let mut cmd = Command::new(bin_path);
        cmd.arg("-C")
            .arg(self.path())
            .args(args)
            .env_remove("RUST_LOG")
            .env_remove("TAGSHIP_CONFIG")
            .env_remove("TAGSHIP_ARCHIVE_FORMAT");
        cmd
    }

    fn run(&self, args: &[&str]) -> Output {
        self.command(args).output().expect("failed to run tagship")
    }
}

#[test]
fn test_help_command() {
    let ctx = TestContext::new();
    let output = ctx.run(&["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"));
    assert!(stdout.contains("archive"));
}

#[test]
fn test_version_at_tag() {
    let ctx = TestContext::new();
    let first = ctx.commit("first", 100);
    ctx.tag("v1.2.3", first);

    let output = ctx.run(&["version"]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "1.2.3");
}

#[test]
fn test_version_past_tag() {
    let ctx = TestContext::new();
    let first = ctx.commit("first", 100);
    ctx.tag("v1.2.3", first);
    ctx.commit("second", 200);
    ctx.commit("third", 300);

    let output = ctx.run(&["version"]);
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        "1.2.4-alpha.4.devel.2"
    );
}

#[test]
fn test_describe_reports_tag() {
    let ctx = TestContext::new();
    let first = ctx.commit("first", 100);
    ctx.tag("v0.1.0", first);
    ctx.commit("second", 200);

    let output = ctx.run(&["describe"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("v0.1.0"));
    assert!(stdout.contains("distance: 1"));
    assert!(stdout.contains("clean:    true"));
}

#[test]
fn test_list_prints_tree() {
    let ctx = TestContext::new();
    let first = ctx.commit("first", 100);
    ctx.tag("v1.0.0", first);

    let output = ctx.run(&["list"]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "first.txt");
}

#[test]
fn test_archive_writes_file() {
    let ctx = TestContext::new();
    let first = ctx.commit("first", 100);
    ctx.tag("v1.0.0", first);
    let out_dir = TempDir::new().unwrap();
    let out = out_dir.path().join("proj.tar.gz");

    let output = ctx.run(&[
        "archive",
        "--prefix",
        "proj-1.0.0",
        "-o",
        out.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let bytes = std::fs::read(&out).unwrap();
    // gzip magic
    assert_eq!(&bytes[..2], &[0x1f, 0x8b]);
    assert!(String::from_utf8_lossy(&output.stdout).contains("proj.tar.gz"));
}

#[test]
fn test_archive_logs_resolved_settings() {
    let ctx = TestContext::new();
    let first = ctx.commit("first", 100);
    ctx.tag("v1.0.0", first);
    let out_dir = TempDir::new().unwrap();
    let out = out_dir.path().join("proj.zip");

    let output = ctx
        .command(&["archive", "--format", "zip", "--prefix", "proj", "-o", out.to_str().unwrap()])
        .env("RUST_LOG", "info")
        .output()
        .expect("failed to run tagship");
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("as zip under \"proj\""), "{stderr}");
    // stdout stays machine readable
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        out.display().to_string()
    );
}

#[test]
fn test_archive_zip_format() {
    let ctx = TestContext::new();
    let first = ctx.commit("first", 100);
    ctx.tag("v1.0.0", first);
    let out_dir = TempDir::new().unwrap();
    let out = out_dir.path().join("proj.zip");

    let output = ctx.run(&["archive", "--format", "zip", "-o", out.to_str().unwrap()]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let bytes = std::fs::read(&out).unwrap();
    assert_eq!(&bytes[..2], b"PK");
}

#[test]
fn test_archive_requires_tag_at_head() {
    let ctx = TestContext::new();
    let first = ctx.commit("first", 100);
    ctx.tag("v1.0.0", first);
    ctx.commit("second", 200);
    let out_dir = TempDir::new().unwrap();
    let out = out_dir.path().join("proj.tar.gz");

    let output = ctx.run(&["archive", "-o", out.to_str().unwrap()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("tag v1.0.0 must also be HEAD"));
    assert!(!out.exists());
}

#[test]
fn test_no_tags_fails() {
    let ctx = TestContext::new();
    ctx.commit("first", 100);

    let output = ctx.run(&["version"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no semver tags found"));
}

#[test]
fn test_package_name_from_config() {
    let ctx = TestContext::new();
    std::fs::write(
        ctx.path().join("tagship.toml"),
        "[package]\nname = \"proj\"\nmaintainer = \"Dev <dev@example.com>\"\ndescription = \"A project\"\n",
    )
    .unwrap();
    let first = ctx.commit("first", 100);
    ctx.tag("v2.0.0", first);

    let output = ctx.run(&["package", "--arch", "amd64", "--format", "rpm"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        "proj-2.0.0-1.x86_64.rpm"
    );
}
