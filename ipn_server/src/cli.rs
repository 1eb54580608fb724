use std::{env, env::VarError};

/// There's no real CLI for the server, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // No arguments are expected, so any argument is a request for help
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Be explicit about which envars to print, so as to avoid accidentally exposing secrets
    const DISPLAY_ENVS: [&str; 13] = [
        "RUST_LOG",
        "IPN_HOST",
        "IPN_PORT",
        "IPN_DATABASE_URL",
        "IPN_VERIFY_URL",
        "IPN_VERIFY_TIMEOUT",
        "IPN_CACHE_PREFIX",
        "IPN_MISS_THRESHOLD",
        "IPN_MISS_WINDOW_DAYS",
        "IPN_TOLERATE_PURCHASE_MISSES",
        "IPN_MISS_COUNTER",
        "IPN_USE_X_FORWARDED_FOR",
        "IPN_USE_FORWARDED",
    ];

    println!("Current environment values:");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
