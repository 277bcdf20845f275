//! gesture_scroll — interactive entry point.

use std::io::{self, Write};

use anyhow::Result;
use env_logger::Env;

use gesture_scroll::app::{run, AppConfig};
use scroll_control::Sensitivity;

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║        Gesture Scroll — hands-free article scrolling         ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let quick = args.iter().any(|a| a == "--quick");
    let mut cfg = AppConfig::from_args(args)?;

    match &cfg.classifier_cmd {
        Some(cmd) => println!("  Classifier: external helper `{}`", cmd.join(" ")),
        None      => println!("  Classifier: built-in blob tracker (+{} ms simulated latency)", cfg.latency_ms),
    }
    println!();

    if quick {
        println!(
            "  Quick-start: sample every {} ms, sensitivity {}\n",
            cfg.control.sample_interval_ms, cfg.control.sensitivity,
        );
    } else {
        configure_interactively(&mut cfg);
        cfg.validate()?;
    }

    println!();
    println!("  Opening window…  move the pointer over the camera preview.");
    println!();

    run(cfg)
}

fn configure_interactively(cfg: &mut AppConfig) {
    let interval = read_line(&format!(
        "  Sample interval ms (default {}): ", cfg.control.sample_interval_ms,
    ));
    if let Ok(ms) = interval.trim().parse::<u64>() {
        cfg.control.sample_interval_ms = ms.max(50);
    }

    let sensitivity = loop {
        let raw = read_line(&format!(
            "  Sensitivity {}–{} (default {}): ",
            Sensitivity::MIN, Sensitivity::MAX, cfg.control.sensitivity,
        ));
        let raw = raw.trim();
        if raw.is_empty() { break cfg.control.sensitivity; }
        match raw.parse::<i32>().ok().and_then(Sensitivity::try_new) {
            Some(s) => break s.get() as i64,
            None    => println!("    ⚠  {}–{} only.", Sensitivity::MIN, Sensitivity::MAX),
        }
    };
    cfg.control.sensitivity = sensitivity;

    if cfg.classifier_cmd.is_none() {
        let timeout = cfg.control.classify_timeout_ms;
        cfg.latency_ms = loop {
            let raw = read_line(&format!("  Simulated latency ms (default {}): ", cfg.latency_ms));
            let raw = raw.trim();
            if raw.is_empty() { break cfg.latency_ms; }
            match raw.parse::<u64>() {
                Ok(ms) if ms < timeout => break ms,
                _ => println!("    ⚠  0–{} only (classification timeout is {} ms).", timeout.saturating_sub(1), timeout),
            }
        };
    }
}

fn read_line(prompt: &str) -> String {
    print!("{}", prompt);
    io::stdout().flush().ok();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf
}
