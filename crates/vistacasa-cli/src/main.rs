// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod runtime;

use anyhow::{Context, Result};
use config::Config;
use runtime::ApiRuntime;
use std::env;
use std::path::PathBuf;
use vistacasa_api::Client;
use vistacasa_app::AppState;
use vistacasa_auth::{Bootstrap, TokenStore, bootstrap_session};
use vistacasa_tui::Exit;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `vistacasa --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;

    if options.demo {
        let mut state = AppState::default();
        state.active_tab = config.start_tab()?;
        let mut runtime = ApiRuntime::demo();
        if vistacasa_tui::run_app(&mut state, &mut runtime)? == Exit::Logout {
            println!("demo session ended");
        }
        return Ok(());
    }

    let db_path = config.db_path()?;
    if options.print_db_path {
        println!("{}", db_path.display());
        return Ok(());
    }

    let store = TokenStore::open(&db_path).with_context(|| {
        format!(
            "open token store {} -- if this path is wrong, set [storage].db_path or VISTACASA_DB_PATH",
            db_path.display()
        )
    })?;
    store.bootstrap()?;

    if options.logout {
        store.clear_token()?;
        println!("signed out; sign in again at {}", config.login_url());
        return Ok(());
    }

    let session = match bootstrap_session(&store, options.callback.as_deref())? {
        Bootstrap::Authenticated(session) => session,
        Bootstrap::LoginRequired => {
            // The browser app would redirect here; a terminal can only
            // point the user at the login entry point.
            println!(
                "not signed in. Open {} and relaunch with --callback <redirect-url>",
                config.login_url()
            );
            return Ok(());
        }
    };

    if options.whoami {
        println!("{}", session.user_id);
        if let Some(saved_at) = store.token_saved_at()? {
            println!("token saved {saved_at}");
        }
        if let Some(token) = store.stored_token()?
            && let Ok(claims) = vistacasa_auth::decode_claims(&token)
            && let Some(expires_at) = claims.expires_at()
        {
            println!("token expires {expires_at}");
        }
        return Ok(());
    }

    let client = Client::new(config.api_base_url(), config.api_timeout()?).with_context(|| {
        format!(
            "invalid [api] config in {}; fix base_url/timeout values",
            options.config_path.display()
        )
    })?;
    if options.check_only {
        return Ok(());
    }

    let mut state = AppState::default();
    state.active_tab = config.start_tab()?;
    let mut runtime = ApiRuntime::remote(client, store, session);
    if vistacasa_tui::run_app(&mut state, &mut runtime)? == Exit::Logout {
        println!("signed out; sign in again at {}", config.login_url());
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    callback: Option<String>,
    print_config_path: bool,
    print_db_path: bool,
    print_example: bool,
    demo: bool,
    check_only: bool,
    logout: bool,
    whoami: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        callback: None,
        print_config_path: false,
        print_db_path: false,
        print_example: false,
        demo: false,
        check_only: false,
        logout: false,
        whoami: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--callback" => {
                let value = iter.next().ok_or_else(|| {
                    anyhow::anyhow!("--callback requires the post-login redirect URL or fragment")
                })?;
                options.callback = Some(value.as_ref().to_owned());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-path" => {
                options.print_db_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--logout" => {
                options.logout = true;
            }
            "--whoami" => {
                options.whoami = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow::anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("vistacasa");
    println!("  --config <path>          Use a specific config path");
    println!("  --callback <url>         Complete login with the redirect URL or fragment");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-path             Print resolved token store path");
    println!("  --print-example-config   Print a config template");
    println!("  --demo                   Browse bundled sample listings offline");
    println!("  --check                  Validate config + token store + API client");
    println!("  --logout                 Clear the stored token and exit");
    println!("  --whoami                 Print the signed-in user id and exit");
    println!("  --help                   Show this help");
}
