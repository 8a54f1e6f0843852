use ah_domain::config::{Config, ConfigSeverity};

/// Run all diagnostic checks and print a summary.
///
/// Returns `Ok(true)` when every check passes, `Ok(false)` when at least
/// one check failed.
pub async fn run(config: &Config, config_path: &str) -> anyhow::Result<bool> {
    println!("agentharness doctor");
    println!("====================\n");

    let mut all_passed = true;

    check_config_file(config_path, &mut all_passed);
    check_config_validation(config, &mut all_passed);
    check_llm_config(config, &mut all_passed);
    check_memory_store(config, &mut all_passed);
    check_workspace(&mut all_passed);

    println!();
    if all_passed {
        println!("All checks passed.");
    } else {
        println!("Some checks failed. Review the output above.");
    }

    Ok(all_passed)
}

// ── Individual checks ─────────────────────────────────────────────────

fn check_config_file(config_path: &str, all_passed: &mut bool) {
    let exists = std::path::Path::new(config_path).exists();
    print_check("Config file exists", exists, if exists { config_path.to_owned() } else { format!("{config_path} not found (using defaults)") });
    if !exists {
        *all_passed = false;
    }
}

fn check_config_validation(config: &Config, all_passed: &mut bool) {
    let issues = config.validate();
    let error_count = issues.iter().filter(|e| e.severity == ConfigSeverity::Error).count();

    if issues.is_empty() {
        print_check("Config validation", true, "no issues".into());
    } else {
        print_check("Config validation", error_count == 0, format!("{} issue(s) ({error_count} error(s))", issues.len()));
        for issue in &issues {
            println!("      {issue}");
        }
        if error_count > 0 {
            *all_passed = false;
        }
    }
}

fn check_llm_config(config: &Config, all_passed: &mut bool) {
    let ok = !config.llm.model.is_empty() && !config.llm.base_url.is_empty();
    print_check(
        "LLM configured",
        ok,
        if ok { format!("{:?} via {}", config.llm.kind, config.llm.base_url) } else { "model or base_url missing".into() },
    );
    if !ok {
        *all_passed = false;
    }
}

fn check_memory_store(config: &Config, all_passed: &mut bool) {
    if !config.memory.enabled {
        print_check("Memory store", true, "disabled".into());
        return;
    }
    let path = std::path::Path::new(&config.memory.db_path);
    let parent_writable = path.parent().map(|p| p.as_os_str().is_empty() || p.exists() || std::fs::create_dir_all(p).is_ok()).unwrap_or(true);
    print_check("Memory store", parent_writable, config.memory.db_path.clone());
    if !parent_writable {
        *all_passed = false;
    }
}

fn check_workspace(all_passed: &mut bool) {
    let path = std::env::current_dir().unwrap_or_default();
    let probe = path.join(".agentharness_doctor_probe");
    let writable = std::fs::write(&probe, b"probe").is_ok();
    let _ = std::fs::remove_file(&probe);

    print_check("Workspace directory", writable, if writable { format!("{} (writable)", path.display()) } else { format!("{} (not writable)", path.display()) });
    if !writable {
        *all_passed = false;
    }
}

// ── Formatting helper ─────────────────────────────────────────────────

fn print_check(name: &str, passed: bool, detail: String) {
    let status = if passed { "PASS" } else { "FAIL" };
    println!("  [{status}] {name}: {detail}");
}
