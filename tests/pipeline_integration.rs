//! End-to-end pipeline runs
//!
//! Every external program is replaced by a `RecordingRunner`, so these tests
//! exercise the real action sequence, layout and packagers without git,
//! strip or mt.exe installed. Runs change the process working directory and
//! are therefore serialized.

use appbundler::cli::CliArgs;
use appbundler::pipeline::version;
use appbundler::progress::{ProgressEvent, ProgressHandler};
use appbundler::tools::RecordingRunner;
use appbundler::{
    BuildContext, BundleProfile, Orchestrator, PipelineError, Platform, ToolConfig, Toolbox,
};
use bzip2::read::BzDecoder;
use clap::Parser;
use serial_test::serial;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const PROFILE: &str = r#"
directories = ["lib"]

[product]
name = "Demo"
identifier = "org.example.demo"
executable = "demo"

[[repositories]]
name = "core"
url = "https://git.example.org/core"
sources = ["src"]
setup = [
    { command = ["make", "-C", "{work}/core"] },
]

[collect]
entry_point = "{work}/core/src/app.py"

[[binaries]]
from = "{binaries}/demo"
to = "{app}"

[misc]
files = [
    { from = "{binaries}/notes.txt", to = "{root}" },
]

[cleanup]
remove = ["*.pyc"]
strip = ["*.so*"]
unused = ["*test*"]

[macos]
binaries = [
    { from = "{binaries}/libfoo.dylib", to = "{app}/lib" },
    { from = "{binaries}/helper.app", to = "{resources}" },
]
assets = [
    { from = "{binaries}/demo.icns", to = "{resources}" },
]
sign = [
    { path = "{resources}/helper.app" },
    { path = "{bundle}", force = true },
]

[macos.disk_image]
contents = ["{root}/Applications", "{bundle}"]
volume_icon = "{resources}/demo.icns"

[linux]
binaries = [
    { from = "{binaries}/*.so*", to = "{app}/lib" },
]

[windows]
binaries = [
    { from = "{binaries}/demo.exe", to = "{root}" },
]
manifests = [
    { dir = "{root}", manifest = "demo.exe.manifest", executable = "demo.exe" },
]
"#;

const RELEASE: &str = "2024-01-01-abc12345";

/// Collects every progress event for later inspection
#[derive(Default)]
struct RecordingHandler {
    events: Mutex<Vec<ProgressEvent>>,
}

impl ProgressHandler for RecordingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

impl RecordingHandler {
    fn work_dir(&self) -> PathBuf {
        self.events
            .lock()
            .unwrap()
            .iter()
            .find_map(|e| match e {
                ProgressEvent::Started { work_dir, .. } => Some(PathBuf::from(work_dir)),
                _ => None,
            })
            .expect("no Started event")
    }

    fn started(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                ProgressEvent::ActionStarted { action } => Some(action.clone()),
                _ => None,
            })
            .collect()
    }

    fn skipped(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                ProgressEvent::ActionSkipped { action } => Some(action.clone()),
                _ => None,
            })
            .collect()
    }
}

/// Input files for one run, all under a single temporary directory
struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let binaries = dir.path().join("binaries");
        fs::create_dir_all(&binaries).unwrap();
        fs::write(binaries.join("demo"), "#!/bin/sh\n").unwrap();
        fs::write(binaries.join("demo.exe"), "MZ").unwrap();
        fs::write(binaries.join("libfoo.so.1"), "\x7fELF").unwrap();
        fs::write(binaries.join("libtest_helper.so"), "\x7fELF").unwrap();
        fs::write(binaries.join("notes.txt"), "release notes\n").unwrap();
        fs::write(dir.path().join("paths.txt"), "/usr/lib/python2.7\n").unwrap();

        let fixture = Self { dir };
        fixture.write_versions(&format!(r#"{{"core": "v1.0", "version": "{}"}}"#, RELEASE));
        fixture
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn write_versions(&self, json: &str) {
        fs::write(self.path("versions.json"), json).unwrap();
    }

    fn args(&self, extra: &[&str]) -> CliArgs {
        let paths = self.path("paths.txt");
        let versions = self.path("versions.json");
        let binaries = self.path("binaries");
        let mut argv = vec![
            "appbundler".to_string(),
            "--paths-file".to_string(),
            paths.display().to_string(),
            "--versions-file".to_string(),
            versions.display().to_string(),
            "--binaries".to_string(),
            binaries.display().to_string(),
        ];
        argv.extend(extra.iter().map(|s| s.to_string()));
        CliArgs::parse_from(argv)
    }

    fn build(&self, extra: &[&str]) -> BuildContext {
        BuildContext::from_args(&self.args(extra)).unwrap()
    }

    fn workon(&self) -> String {
        self.path("work").display().to_string()
    }
}

fn profile() -> BundleProfile {
    BundleProfile::parse(PROFILE, "test").unwrap()
}

fn orchestrator(
    platform: Platform,
    runner: &Arc<RecordingRunner>,
    events: &Arc<RecordingHandler>,
) -> Orchestrator {
    let tools = Toolbox::with_runner(runner.clone(), ToolConfig::default());
    Orchestrator::new(platform, tools).with_progress(events.clone())
}

fn tar_entries(path: &Path) -> Vec<String> {
    let file = fs::File::open(path).unwrap();
    let mut archive = tar::Archive::new(BzDecoder::new(file));
    archive
        .entries()
        .unwrap()
        .map(|e| {
            e.unwrap()
                .path()
                .unwrap()
                .to_string_lossy()
                .trim_end_matches('/')
                .to_string()
        })
        .collect()
}

fn zip_entries(path: &Path) -> Vec<String> {
    let file = fs::File::open(path).unwrap();
    let archive = zip::ZipArchive::new(file).unwrap();
    archive.file_names().map(str::to_string).collect()
}

#[test]
#[serial]
fn test_linux_run_produces_tarball() {
    let fixture = Fixture::new();
    let runner = Arc::new(RecordingRunner::new());
    let events = Arc::new(RecordingHandler::default());
    let workon = fixture.workon();

    let outcome = orchestrator(Platform::Linux, &runner, &events)
        .execute(fixture.build(&["--workon", &workon]), profile())
        .unwrap();

    let stem = format!("Demo-{}-{}", Platform::Linux.tag(), RELEASE);
    let artifact = outcome.artifact.expect("tarball expected");
    assert_eq!(
        artifact.file_name().unwrap().to_string_lossy(),
        format!("{}.tar.bz2", stem)
    );
    assert_eq!(artifact.parent().unwrap(), fixture.path("work").canonicalize().unwrap());
    assert_eq!(
        outcome.executed,
        vec![
            "gitclone",
            "gitcheckout",
            "setup",
            "createdirs",
            "collectdeps",
            "copybinaries",
            "copymisc",
            "cleanup",
            "rmunused",
            "tarball"
        ]
    );

    let entries = tar_entries(&artifact);
    assert!(entries.iter().all(|e| e == &stem || e.starts_with(&format!("{}/", stem))));
    assert!(entries.contains(&format!("{}/demo", stem)));
    assert!(entries.contains(&format!("{}/notes.txt", stem)));
    assert!(entries.contains(&format!("{}/lib/libfoo.so.1", stem)));
    assert!(!entries.iter().any(|e| e.contains("libtest_helper")));

    let lines = runner.command_lines();
    assert!(lines.iter().any(|l| l.starts_with("git clone https://git.example.org/core")));
    assert!(lines.contains(&"git checkout --quiet v1.0".to_string()));
    assert!(lines.iter().any(|l| l.starts_with("make -C ")));
    let strip = ToolConfig::default().strip;
    assert!(lines.iter().any(|l| l.starts_with(&strip) && l.ends_with("libfoo.so.1")));
}

#[test]
#[serial]
fn test_repackaging_reuses_renamed_tree() {
    let fixture = Fixture::new();
    let runner = Arc::new(RecordingRunner::new());
    let events = Arc::new(RecordingHandler::default());
    let workon = fixture.workon();

    let first = orchestrator(Platform::Linux, &runner, &events)
        .execute(fixture.build(&["--workon", &workon]), profile())
        .unwrap()
        .artifact
        .unwrap();
    let second = orchestrator(Platform::Linux, &runner, &events)
        .execute(fixture.build(&["--workon", &workon, "--do", "tarball"]), profile())
        .unwrap();

    assert_eq!(second.executed, vec!["tarball"]);
    assert_eq!(second.artifact, Some(first.clone()));
    let stem = format!("Demo-{}-{}", Platform::Linux.tag(), RELEASE);
    assert!(fixture.path("work").join(&stem).join("demo").is_file());
    assert!(tar_entries(&first).contains(&format!("{}/demo", stem)));
}

#[cfg(unix)]
#[test]
#[serial]
fn test_macos_run_signs_nested_code_first() {
    use std::os::unix::fs::PermissionsExt;

    const MACH_O: [u8; 8] = [0xcf, 0xfa, 0xed, 0xfe, 0x07, 0x00, 0x00, 0x01];
    let fixture = Fixture::new();
    let binaries = fixture.path("binaries");
    fs::write(binaries.join("demo"), MACH_O).unwrap();
    fs::write(binaries.join("libfoo.dylib"), MACH_O).unwrap();
    fs::write(binaries.join("demo.icns"), "icns").unwrap();
    fs::create_dir_all(binaries.join("helper.app/Contents")).unwrap();
    fs::write(binaries.join("helper.app/Contents/Info.plist"), "<plist/>").unwrap();

    let programs = ToolConfig::default();
    let runner = Arc::new(RecordingRunner::new());
    runner.respond(
        &programs.otool,
        "demo:\n\t/opt/local/lib/libssl.1.0.0.dylib (compatibility version 1.0.0)\n\t/usr/lib/libSystem.B.dylib (compatibility version 1.0.0)\n",
    );
    let events = Arc::new(RecordingHandler::default());
    let workon = fixture.workon();

    let outcome = orchestrator(Platform::MacOs, &runner, &events)
        .execute(
            fixture.build(&["--workon", &workon, "--codesign", "Developer ID Application: Demo"]),
            profile(),
        )
        .unwrap();

    assert_eq!(
        outcome.executed[8..],
        ["plist", "launcher", "copyassets", "fixdylibs", "codesign", "dmg"]
    );
    let artifact = outcome.artifact.unwrap();
    assert_eq!(
        artifact.file_name().unwrap().to_string_lossy(),
        format!("Demo-OSX-{}.dmg", RELEASE)
    );

    let contents = fixture.path("work/Demo/Demo.app/Contents");
    let plist = fs::read_to_string(contents.join("Info.plist")).unwrap();
    assert!(plist.contains("<string>org.example.demo</string>"));
    assert!(plist.contains("<string>MacOS/launcher</string>"));
    let launcher = contents.join("MacOS/launcher");
    let mode = fs::metadata(&launcher).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o755);
    assert!(contents.join("Resources/demo.icns").is_file());
    assert!(fs::symlink_metadata(fixture.path("work/Demo/Applications"))
        .unwrap()
        .file_type()
        .is_symlink());

    let lines = runner.command_lines();
    let position = |pred: &dyn Fn(&String) -> bool| lines.iter().position(|l| pred(l)).unwrap();

    let rewrites: Vec<&String> = lines
        .iter()
        .filter(|l| l.starts_with(&programs.install_name_tool))
        .collect();
    assert_eq!(rewrites.len(), 2);
    assert!(rewrites.iter().all(|l| l.contains(
        "-change /opt/local/lib/libssl.1.0.0.dylib @executable_path/lib/libssl.1.0.0.dylib"
    )));
    assert!(!rewrites.iter().any(|l| l.contains("libSystem")));

    let signs: Vec<&String> = lines
        .iter()
        .filter(|l| l.starts_with(&format!("{} ", programs.codesign)))
        .collect();
    assert_eq!(signs.len(), 2);
    assert!(signs[0].ends_with("helper.app"));
    assert!(!signs[0].contains("--force"));
    assert!(signs[1].contains("--force"));
    assert!(signs[1].ends_with("Demo.app"));

    let last_rewrite = lines
        .iter()
        .rposition(|l| l.starts_with(&programs.install_name_tool))
        .unwrap();
    let first_sign = position(&|l| l.starts_with(&format!("{} ", programs.codesign)));
    let create = position(&|l| l.starts_with(&format!("{} create", programs.hdiutil)));
    let convert = position(&|l| l.starts_with(&format!("{} convert", programs.hdiutil)));
    assert!(last_rewrite < first_sign);
    assert!(first_sign < create);
    assert!(create < convert);
}

#[test]
#[serial]
fn test_windows_run_produces_zip_in_output_dir() {
    let fixture = Fixture::new();
    let runner = Arc::new(RecordingRunner::new());
    let events = Arc::new(RecordingHandler::default());
    let workon = fixture.workon();
    let out = fixture.path("out").display().to_string();

    let outcome = orchestrator(Platform::Windows, &runner, &events)
        .execute(
            fixture.build(&["--workon", &workon, "--output-dir", &out]),
            profile(),
        )
        .unwrap();

    let stem = format!("Demo-{}-{}", Platform::Windows.tag(), RELEASE);
    let artifact = outcome.artifact.expect("zip expected");
    assert_eq!(artifact, fixture.path("out").join(format!("{}.zip", stem)));
    assert!(artifact.is_file());

    let entries = zip_entries(&artifact);
    assert!(entries.contains(&format!("{}/demo.exe", stem)));
    assert!(entries.contains(&format!("{}/notes.txt", stem)));
    // Shared objects are only copied by the linux rules
    assert!(!entries.iter().any(|e| e.ends_with(".so.1")));

    let mt = runner
        .commands()
        .into_iter()
        .find(|c| c.args.iter().any(|a| a == "-outputresource:demo.exe;#1"))
        .expect("manifest embedding");
    assert_eq!(mt.args[..3], ["-nologo", "-manifest", "demo.exe.manifest"]);
    let strip = ToolConfig::default().strip;
    assert!(!runner.command_lines().iter().any(|l| l.starts_with(&strip)));
}

#[test]
#[serial]
fn test_nightly_version_hashes_repository_state() {
    let fixture = Fixture::new();
    fixture.write_versions(r#"{"core": "v1.0", "version": "nightly"}"#);
    // An existing clone survives when gitclone is skipped
    fs::create_dir_all(fixture.path("work/core")).unwrap();

    let runner = Arc::new(RecordingRunner::new());
    runner.respond("git describe", "v1.0-3-gdeadbee\n");
    let events = Arc::new(RecordingHandler::default());
    let workon = fixture.workon();

    let outcome = orchestrator(Platform::Linux, &runner, &events)
        .execute(
            fixture.build(&["--workon", &workon, "--skip", "gitclone"]),
            profile(),
        )
        .unwrap();

    let describe = |_: &str| -> anyhow::Result<String> { Ok("v1.0-3-gdeadbee".to_string()) };
    let expected = version::resolve(None, &["core".to_string()], &describe);
    let name = outcome.artifact.unwrap().file_name().unwrap().to_string_lossy().into_owned();
    assert_eq!(
        name,
        format!("Demo-{}-{}.tar.bz2", Platform::Linux.tag(), expected)
    );
}

#[test]
#[serial]
fn test_seeded_config_lands_in_app_dir() {
    let fixture = Fixture::new();
    let seed = fixture.path("seed");
    fs::create_dir_all(&seed).unwrap();
    fs::write(seed.join("settings.ini"), "[General]\n").unwrap();

    let runner = Arc::new(RecordingRunner::new());
    let events = Arc::new(RecordingHandler::default());
    let workon = fixture.workon();
    let seed_arg = seed.display().to_string();

    let outcome = orchestrator(Platform::Linux, &runner, &events)
        .execute(
            fixture.build(&["--workon", &workon, "--seeded-config", &seed_arg]),
            profile(),
        )
        .unwrap();

    let executed = &outcome.executed;
    assert_eq!(executed[executed.len() - 2..], ["seededconfig", "tarball"]);

    let stem = format!("Demo-{}-{}", Platform::Linux.tag(), RELEASE);
    let entries = tar_entries(&outcome.artifact.unwrap());
    assert!(entries.contains(&format!("{}/config/settings.ini", stem)));
}

#[test]
#[serial]
fn test_selection_is_observable() {
    let fixture = Fixture::new();
    let runner = Arc::new(RecordingRunner::new());
    let events = Arc::new(RecordingHandler::default());
    let workon = fixture.workon();

    let outcome = orchestrator(Platform::Linux, &runner, &events)
        .execute(
            fixture.build(&["--workon", &workon, "--do", "createdirs", "copybinaries"]),
            profile(),
        )
        .unwrap();

    assert!(outcome.artifact.is_none());
    assert_eq!(outcome.executed, vec!["createdirs", "copybinaries"]);
    assert_eq!(events.started(), vec!["createdirs", "copybinaries"]);
    assert_eq!(
        events.skipped(),
        vec![
            "gitclone",
            "gitcheckout",
            "setup",
            "collectdeps",
            "copymisc",
            "cleanup",
            "rmunused",
            "tarball"
        ]
    );
    assert!(runner.commands().is_empty());
    assert!(fixture.path("work/Demo/demo").is_file());
    assert!(fixture.path("work/Demo/lib/libfoo.so.1").is_file());
}

#[test]
#[serial]
fn test_skip_wins_over_do() {
    let fixture = Fixture::new();
    let runner = Arc::new(RecordingRunner::new());
    let events = Arc::new(RecordingHandler::default());
    let workon = fixture.workon();

    let outcome = orchestrator(Platform::Linux, &runner, &events)
        .execute(
            fixture.build(&[
                "--workon",
                &workon,
                "--do",
                "createdirs",
                "copybinaries",
                "--skip",
                "copybinaries",
            ]),
            profile(),
        )
        .unwrap();

    assert_eq!(outcome.executed, vec!["createdirs"]);
    assert!(!fixture.path("work/Demo/demo").exists());
}

#[test]
#[serial]
fn test_failure_stops_run_and_keeps_temporary_dir() {
    let fixture = Fixture::new();
    let runner = Arc::new(RecordingRunner::new());
    runner.fail_on("make");
    let events = Arc::new(RecordingHandler::default());

    let err = orchestrator(Platform::Linux, &runner, &events)
        .execute(fixture.build(&[]), profile())
        .unwrap_err();

    assert!(matches!(err, PipelineError::ActionFailed { .. }));
    assert_eq!(err.action(), Some("setup"));
    assert_eq!(events.started(), vec!["gitclone", "gitcheckout", "setup"]);
    assert!(!runner.command_lines().iter().any(|l| l.contains("depcollector")));

    let work_dir = events.work_dir();
    assert!(work_dir.is_dir(), "temporary working directory should be kept");
    fs::remove_dir_all(&work_dir).unwrap();
}

#[test]
#[serial]
fn test_missing_binary_fails_copybinaries() {
    let fixture = Fixture::new();
    fs::remove_file(fixture.path("binaries/demo")).unwrap();
    let runner = Arc::new(RecordingRunner::new());
    let events = Arc::new(RecordingHandler::default());
    let workon = fixture.workon();

    let err = orchestrator(Platform::Linux, &runner, &events)
        .execute(fixture.build(&["--workon", &workon]), profile())
        .unwrap_err();

    assert_eq!(err.action(), Some("copybinaries"));
    assert!(format!("{}", err).contains("nothing matches"));
    assert!(!events.started().contains(&"tarball".to_string()));
}

#[test]
#[serial]
fn test_temporary_dir_removed_after_success() {
    let fixture = Fixture::new();
    let runner = Arc::new(RecordingRunner::new());
    let events = Arc::new(RecordingHandler::default());
    let out = fixture.path("out").display().to_string();

    let outcome = orchestrator(Platform::Linux, &runner, &events)
        .execute(fixture.build(&["--output-dir", &out]), profile())
        .unwrap();

    let artifact = outcome.artifact.unwrap();
    assert_eq!(artifact.parent().unwrap(), fixture.path("out"));
    assert!(artifact.is_file());
    assert!(!events.work_dir().exists());
}
