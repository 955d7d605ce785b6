//! End-to-end tests for matrix-user-admin.
//!
//! Fake `psql` and `mas` executables are written into a temp directory.
//! They record their arguments, stdin and environment to files there and
//! answer with canned output, so the real subprocess path is exercised
//! without a database or auth service.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command as ProcessCommand;

use tempfile::TempDir;

use matrix_user_admin::cli::Command;
use matrix_user_admin::config::Settings;
use matrix_user_admin::error::AdminError;
use matrix_user_admin::mas::MasCli;
use matrix_user_admin::synapse::Psql;

const USERS_CSV: &str = "name,admin,deactivated,creation_ts
@alice:example.org,1,0,1700000000
@bob:example.org,0,1,notanumber
broken,1
@carol:example.org,0,0,0
";

/// Scratch directory with fake external tools.
struct Harness {
    dir: TempDir,
}

impl Harness {
    fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn write_script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, format!("#!/bin/sh\n{}", body)).expect("Failed to write script");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .expect("Failed to make script executable");
        path
    }

    /// A `psql` that logs its invocation, then runs `respond`.
    fn fake_psql(&self, respond: &str) -> PathBuf {
        let log = self.dir.path().display().to_string();
        self.write_script(
            "psql",
            &format!(
                "printf '%s\\n' \"$@\" > {log}/psql.args\n\
                 cat > {log}/psql.stdin\n\
                 printf '%s' \"$PGPASSWORD\" > {log}/psql.password\n\
                 printf '%s' \"$PATH\" > {log}/psql.path\n\
                 {respond}\n"
            ),
        )
    }

    /// A `mas` that logs its invocation and exits with `code`.
    fn fake_mas(&self, code: i32) -> PathBuf {
        let log = self.dir.path().display().to_string();
        self.write_script(
            "mas",
            &format!(
                "printf '%s\\n' \"$@\" > {log}/mas.args\n\
                 printf '%s' \"$MAS_CONFIG\" > {log}/mas.config\n\
                 exit {code}\n"
            ),
        )
    }

    fn settings(&self, psql: &Path, mas: &Path) -> Settings {
        let mut settings = Settings::default();
        settings.database.client = psql.display().to_string();
        settings.database.password = Some("s3cret".to_string());
        settings.mas.binary = mas.to_path_buf();
        settings.mas.config = PathBuf::from("/etc/mas/config.yaml");
        settings
    }

    fn read(&self, name: &str) -> Option<String> {
        fs::read_to_string(self.path(name)).ok()
    }

    fn run(&self, settings: &Settings, command: Command) -> (Result<(), AdminError>, String) {
        let db = Psql::new(settings.database.clone(), settings.subprocess.clone());
        let locker = MasCli::new(settings.mas.clone(), settings.subprocess.clone());
        let mut out = Vec::new();
        let result = command.execute(&db, &locker, &mut out);
        (result, String::from_utf8(out).expect("Output is not UTF-8"))
    }
}

fn delete(username: &str) -> Command {
    Command::Delete {
        username: username.to_string(),
    }
}

#[test]
fn test_list_renders_table() {
    let harness = Harness::new();
    let psql = harness.fake_psql(&format!("cat <<'CSV'\n{}CSV", USERS_CSV));
    let mas = harness.fake_mas(0);
    let settings = harness.settings(&psql, &mas);

    let (result, out) = harness.run(&settings, Command::List);
    assert!(result.is_ok());

    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 2 + 3);
    assert_eq!(
        lines[2],
        format!("{:<40} {:<10} {:<12} {}", "@alice:example.org", "Yes", "No", "2023-11-14")
    );
    assert_eq!(
        lines[3],
        format!("{:<40} {:<10} {:<12} {}", "@bob:example.org", "No", "Yes", "notanumber")
    );
    assert!(lines[4].starts_with("@carol:example.org"));

    let stdin = harness.read("psql.stdin").unwrap();
    assert_eq!(
        stdin,
        "COPY (SELECT name, admin, deactivated, creation_ts FROM users ORDER BY name ASC) \
         TO STDOUT WITH CSV HEADER;\n"
    );
    assert!(harness.read("mas.args").is_none());
}

#[test]
fn test_client_gets_connection_and_restricted_env() {
    let harness = Harness::new();
    let psql = harness.fake_psql("echo 'name,admin,deactivated,creation_ts'");
    let mas = harness.fake_mas(0);
    let settings = harness.settings(&psql, &mas);

    let (result, _) = harness.run(&settings, Command::List);
    assert!(result.is_ok());

    let args = harness.read("psql.args").unwrap();
    let args: Vec<&str> = args.lines().collect();
    for pair in [["-h", "127.0.0.1"], ["-U", "synapse_user"], ["-d", "synapse_db"]] {
        assert!(args.windows(2).any(|w| w == pair), "missing {:?}", pair);
    }
    assert!(args.windows(2).any(|w| w == ["-v", "ON_ERROR_STOP=1"]));
    assert_eq!(harness.read("psql.password").unwrap(), "s3cret");
    assert_eq!(harness.read("psql.path").unwrap(), "/usr/bin:/bin");
}

#[test]
fn test_list_database_failure() {
    let harness = Harness::new();
    let psql = harness.fake_psql("echo 'psql: error: connection refused' >&2\nexit 2");
    let mas = harness.fake_mas(0);
    let settings = harness.settings(&psql, &mas);

    let (result, out) = harness.run(&settings, Command::List);
    match result {
        Err(AdminError::Database { stderr }) => {
            assert_eq!(stderr, "psql: error: connection refused")
        }
        other => panic!("expected database error, got {:?}", other),
    }
    assert!(out.is_empty());
}

#[test]
fn test_delete_deactivates_then_locks() {
    let harness = Harness::new();
    let psql = harness.fake_psql("echo 'UPDATE 1'");
    let mas = harness.fake_mas(0);
    let settings = harness.settings(&psql, &mas);

    let (result, out) = harness.run(&settings, delete("@alice:example.org"));
    assert!(result.is_ok());
    assert!(out.contains("    - Marked deactivated in Synapse DB.\n"));
    assert!(!out.contains("Warning"));

    let stdin = harness.read("psql.stdin").unwrap();
    assert_eq!(
        stdin,
        "UPDATE users SET deactivated = 1, password_hash = '' WHERE name = :'mxid';\n"
    );
    let args = harness.read("psql.args").unwrap();
    assert!(args.lines().any(|a| a == "mxid=@alice:example.org"));

    assert_eq!(harness.read("mas.args").unwrap(), "manage\nlock-user\nalice\n");
    assert_eq!(harness.read("mas.config").unwrap(), "/etc/mas/config.yaml");
}

#[test]
fn test_delete_without_sigil_touches_nothing() {
    let harness = Harness::new();
    let psql = harness.fake_psql("echo 'UPDATE 1'");
    let mas = harness.fake_mas(0);
    let settings = harness.settings(&psql, &mas);

    let (result, out) = harness.run(&settings, delete("alice"));
    assert!(matches!(result, Err(AdminError::Validation { .. })));
    assert!(out.is_empty());
    assert!(harness.read("psql.args").is_none());
    assert!(harness.read("mas.args").is_none());
}

#[test]
fn test_delete_database_failure_skips_lock() {
    let harness = Harness::new();
    let psql = harness.fake_psql("echo 'ERROR:  permission denied for table users' >&2\nexit 3");
    let mas = harness.fake_mas(0);
    let settings = harness.settings(&psql, &mas);

    let (result, _) = harness.run(&settings, delete("@alice:example.org"));
    assert!(matches!(result, Err(AdminError::Database { .. })));
    assert!(harness.read("mas.args").is_none());
}

#[test]
fn test_delete_lock_failure_still_succeeds() {
    let harness = Harness::new();
    let psql = harness.fake_psql("echo 'UPDATE 1'");
    let mas = harness.fake_mas(1);
    let settings = harness.settings(&psql, &mas);

    let (result, out) = harness.run(&settings, delete("@alice:example.org"));
    assert!(result.is_ok());
    assert!(out.contains("    ! Warning: Failed to run MAS lock: mas exited with status 1\n"));
    assert!(out.ends_with("[+] User @alice:example.org has been processed.\n"));
}

#[test]
fn test_delete_missing_mas_binary_still_succeeds() {
    let harness = Harness::new();
    let psql = harness.fake_psql("echo 'UPDATE 1'");
    let settings = harness.settings(&psql, &harness.path("no-such-mas"));

    let (result, out) = harness.run(&settings, delete("@alice:example.org"));
    assert!(result.is_ok());
    assert!(out.contains("    ! Warning: Failed to run MAS lock:"));
}

fn binary(harness: &Harness, config: &Path) -> ProcessCommand {
    let mut cmd = ProcessCommand::new(env!("CARGO_BIN_EXE_matrix-user-admin"));
    cmd.arg("--config")
        .arg(config)
        .env_remove("RUST_LOG")
        .env("MATRIX_ADMIN_DB_PASSWORD", "from-env")
        .current_dir(harness.dir.path());
    cmd
}

fn write_config(harness: &Harness, psql: &Path, mas: &Path) -> PathBuf {
    let config = harness.path("config.toml");
    fs::write(
        &config,
        format!(
            "[database]\nclient = \"{}\"\npassword = \"from-file\"\n\n[mas]\nbinary = \"{}\"\n",
            psql.display(),
            mas.display()
        ),
    )
    .expect("Failed to write config");
    config
}

#[test]
fn test_binary_list_exit_success() {
    let harness = Harness::new();
    let psql = harness.fake_psql(&format!("cat <<'CSV'\n{}CSV", USERS_CSV));
    let mas = harness.fake_mas(0);
    let config = write_config(&harness, &psql, &mas);

    let output = binary(&harness, &config).arg("list").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().count(), 5);
    assert_eq!(harness.read("psql.password").unwrap(), "from-env");
}

#[test]
fn test_binary_delete_without_sigil_fails() {
    let harness = Harness::new();
    let psql = harness.fake_psql("echo 'UPDATE 1'");
    let mas = harness.fake_mas(0);
    let config = write_config(&harness, &psql, &mas);

    let output = binary(&harness, &config)
        .args(["delete", "alice"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout,
        "Error: Please provide full MXID (e.g. @user:example.org)\n"
    );
    assert!(harness.read("psql.args").is_none());
    assert!(harness.read("mas.args").is_none());
}

#[test]
fn test_binary_delete_database_failure_exit_code() {
    let harness = Harness::new();
    let psql = harness.fake_psql("echo 'ERROR:  relation \"users\" does not exist' >&2\nexit 3");
    let mas = harness.fake_mas(0);
    let config = write_config(&harness, &psql, &mas);

    let output = binary(&harness, &config)
        .args(["delete", "@alice:example.org"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error executing SQL: ERROR:  relation \"users\" does not exist"));
    assert!(harness.read("mas.args").is_none());
}

#[test]
fn test_binary_delete_lock_failure_exit_success() {
    let harness = Harness::new();
    let psql = harness.fake_psql("echo 'UPDATE 1'");
    let mas = harness.fake_mas(7);
    let config = write_config(&harness, &psql, &mas);

    let output = binary(&harness, &config)
        .args(["delete", "@alice:example.org"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("! Warning: Failed to run MAS lock: mas exited with status 7"));
    assert_eq!(harness.read("mas.args").unwrap(), "manage\nlock-user\nalice\n");
}

#[test]
fn test_binary_bad_config_fails() {
    let harness = Harness::new();
    let config = harness.path("config.toml");
    fs::write(&config, "[logging]\nlevel = \"loud\"\n").unwrap();

    let output = binary(&harness, &config).arg("list").output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("Error loading configuration:"));
}
