#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::time::{SystemTime, UNIX_EPOCH};

use metric_profile_editor::api::file::save_snapshot;
use metric_profile_editor::api::memory::Snapshot;
use metric_profile_editor::profile::access::{Session, UserDetails, UserGroups};
use metric_profile_editor::profile::wire::ServiceEntry;

pub struct CmdResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub log_path: PathBuf,
}

impl CmdResult {
    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }

    /// First stdout line parsed as JSON.
    pub fn json(&self) -> serde_json::Value {
        let line = self.stdout.lines().next().unwrap_or_default();
        serde_json::from_str(line).unwrap_or_else(|e| {
            panic!("stdout is not JSON ({e}); log: {}", self.log_path.display())
        })
    }
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn resolve_bin_path() -> PathBuf {
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_mpe") {
        return PathBuf::from(path);
    }

    let exe_name = if cfg!(windows) { "mpe.exe" } else { "mpe" };
    let fallback = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(PathBuf::from))
        .and_then(|deps| deps.parent().map(PathBuf::from))
        .map(|debug_dir| debug_dir.join(exe_name));

    match fallback {
        Some(path) if path.exists() => path,
        _ => panic!("unable to resolve mpe binary path for integration test"),
    }
}

pub fn run_cli_case(case_name: &str, args: &[&str]) -> CmdResult {
    let root = std::env::temp_dir().join("mpe-test-logs");
    fs::create_dir_all(&root).expect("create temp test log dir");

    let log_path = root.join(format!("{}-{}.log", sanitize(case_name), now_millis()));
    let bin_path = resolve_bin_path();

    let output = Command::new(&bin_path)
        .args(args)
        .env("MPE_LOG_ENABLED", "false")
        .env_remove("MPE_OUTPUT_FORMAT")
        .env("RUST_BACKTRACE", "1")
        .output()
        .expect("execute mpe command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let mut log_content = String::new();
    log_content.push_str(&format!("case={case_name}\n"));
    log_content.push_str(&format!("bin={}\n", bin_path.display()));
    log_content.push_str(&format!("args={args:?}\n"));
    log_content.push_str(&format!("status={}\n", output.status));
    log_content.push_str("----- stdout -----\n");
    log_content.push_str(&stdout);
    log_content.push('\n');
    log_content.push_str("----- stderr -----\n");
    log_content.push_str(&stderr);
    log_content.push('\n');
    fs::write(&log_path, log_content).expect("write test log");

    CmdResult {
        status: output.status,
        stdout,
        stderr,
        log_path,
    }
}

// ──────────────────── fixtures ────────────────────

pub fn entry(service: &str, metrics: &[&str]) -> ServiceEntry {
    ServiceEntry {
        service: service.to_string(),
        metrics: metrics.iter().map(|m| (*m).to_string()).collect(),
    }
}

pub fn session(username: &str, superuser: bool, groups: &[&str]) -> Session {
    Session {
        active: true,
        userdetails: UserDetails {
            username: username.to_string(),
            is_superuser: superuser,
            groups: UserGroups {
                metricprofiles: groups.iter().map(|g| (*g).to_string()).collect(),
            },
        },
    }
}

/// A tenant with two vocabularies and one profile, ARGO_MON, owned by EGI.
pub fn seeded_snapshot() -> Snapshot {
    let mut snap = Snapshot {
        session: session("alice", false, &["EGI"]),
        service_flavours: ["SRM", "webdav", "ARC-CE", "CREAM-CE"]
            .map(String::from)
            .to_vec(),
        metrics: [
            "org.sam.SRM-Put",
            "org.sam.SRM-Get",
            "ch.cern.WebDAV",
            "org.nordugrid.ARC-CE-submit",
        ]
        .map(String::from)
        .to_vec(),
        ..Snapshot::default()
    };
    snap.seed_profile(
        "ARGO_MON",
        "Central ARGO profile",
        "EGI",
        vec![
            entry("SRM", &["org.sam.SRM-Put", "org.sam.SRM-Get"]),
            entry("webdav", &["ch.cern.WebDAV"]),
        ],
    );
    snap
}

/// Temp workspace holding a data snapshot and a config that points at it.
pub struct Workspace {
    pub dir: tempfile::TempDir,
    pub config: PathBuf,
    pub data: PathBuf,
}

impl Workspace {
    pub fn new(snapshot: &Snapshot) -> Self {
        let dir = tempfile::tempdir().expect("create workspace");
        let data = dir.path().join("snapshot.json");
        save_snapshot(snapshot, &data).expect("write snapshot");
        let config = dir.path().join("config.toml");
        fs::write(
            &config,
            format!(
                "[log]\nenabled = false\n\n[paths]\ndata_file = {:?}\n",
                data.display().to_string()
            ),
        )
        .expect("write config");
        Self { dir, config, data }
    }

    pub fn write_script(&self, name: &str, script: &serde_json::Value) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, script.to_string()).expect("write script");
        path
    }

    pub fn snapshot(&self) -> Snapshot {
        let raw = fs::read_to_string(&self.data).expect("read snapshot");
        serde_json::from_str(&raw).expect("parse snapshot")
    }

    /// `mpe --config <cfg> --json <args...>`
    pub fn run(&self, case_name: &str, args: &[&str]) -> CmdResult {
        let config = path_str(&self.config);
        let mut full = vec!["--config", config.as_str(), "--json"];
        full.extend_from_slice(args);
        run_cli_case(case_name, &full)
    }
}

pub fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
