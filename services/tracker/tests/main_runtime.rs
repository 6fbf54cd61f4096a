use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

fn spawn_tracker(envs: &[(&str, &str)]) -> std::process::Child {
    let bin = std::env::var("CARGO_BIN_EXE_larder-tracker").unwrap_or_else(|_| {
        let current = std::env::current_exe().expect("current exe");
        let debug_dir = current
            .parent()
            .and_then(|p| p.parent())
            .expect("target debug dir");
        debug_dir
            .join("larder-tracker")
            .to_string_lossy()
            .to_string()
    });
    let mut cmd = Command::new(bin);
    cmd.env("LARDER_TRACKER_BIND", "127.0.0.1:0")
        .env("LARDER_TRACKER_METRICS_BIND", "127.0.0.1:0")
        .env("LARDER_TRACKER_STORAGE_BACKEND", "memory")
        .env_remove("LARDER_TRACKER_CONFIG")
        .env_remove("LARDER_TRACKER_POSTGRES_URL")
        .env_remove("LARDER_UNMONITORED_POLICY")
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    for (key, value) in envs {
        cmd.env(key, value);
    }
    cmd.spawn().expect("spawn tracker")
}

fn stop_with_sigint(child: &mut std::process::Child) {
    let pid = child.id().to_string();
    let status = Command::new("kill")
        .arg("-INT")
        .arg(pid)
        .status()
        .expect("send SIGINT");
    assert!(status.success());
}

fn wait_for_exit(child: &mut std::process::Child, timeout: Duration) -> std::process::ExitStatus {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait().expect("try_wait") {
            return status;
        }
        if Instant::now() >= deadline {
            child.kill().expect("kill on timeout");
            return child.wait().expect("wait after kill");
        }
        std::thread::sleep(Duration::from_millis(25));
    }
}

#[test]
fn binary_starts_and_stops_on_sigint() {
    let mut child = spawn_tracker(&[]);
    std::thread::sleep(Duration::from_millis(250));
    stop_with_sigint(&mut child);
    let status = wait_for_exit(&mut child, Duration::from_secs(3));
    assert!(status.success());
}

#[test]
fn binary_exits_with_error_on_bad_policy() {
    let mut child = spawn_tracker(&[("LARDER_UNMONITORED_POLICY", "ignore")]);
    let status = wait_for_exit(&mut child, Duration::from_secs(3));
    assert!(!status.success());
}
