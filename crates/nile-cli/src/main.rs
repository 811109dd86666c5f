mod request;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use nile_auth::{
    CookiePolicy, SessionMinter, SessionUser, TenantCookieState, TenantRow, decide,
    resolve_origin, use_secure_cookies,
};
use nile_config::{EnvSecretStore, default_config_dir, load_config_from_dir, write_default_config};
use tracing::debug;

use crate::request::{cookie_headers, parse_headers, redirect_context, request_context};

#[derive(Debug, Parser)]
#[command(name = "nile-session", about = "Inspect Nile cookie policy, tenant cookies and sessions")]
struct Cli {
    #[arg(long, global = true)]
    json: bool,

    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Write a starter nile.toml
    Init {
        #[arg(long)]
        force: bool,
    },
    /// Resolve the logical origin of a request or redirect
    Origin {
        #[arg(long)]
        url: String,
        #[arg(long = "header", value_parser = parse_key_val)]
        headers: Vec<(String, String)>,
        /// Treat the input as a redirect to this location
        #[arg(long)]
        location: Option<String>,
    },
    /// Show the secure-cookie decision and the cookie table for a request
    Cookies {
        #[arg(long)]
        url: String,
        #[arg(long = "header", value_parser = parse_key_val)]
        headers: Vec<(String, String)>,
    },
    /// Reconcile the tenant cookie against a list of tenant ids (first is the default)
    Reconcile {
        /// Raw Cookie header sent by the client
        #[arg(long)]
        cookie: Option<String>,
        #[arg(long = "tenant")]
        tenants: Vec<String>,
    },
    /// Mint a session cookie for a user
    Mint {
        #[arg(long)]
        url: String,
        #[arg(long = "header", value_parser = parse_key_val)]
        headers: Vec<(String, String)>,
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        image: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg_dir = cli.config_dir.clone().unwrap_or_else(default_config_dir);

    let config = load_config_from_dir(&cfg_dir)
        .with_context(|| format!("loading config from {}", cfg_dir.display()))?;
    init_logging(&config.logging.level);
    debug!(config_dir = %cfg_dir.display(), "config loaded");

    match cli.command {
        Commands::Init { force } => {
            let path = write_default_config(&cfg_dir, force)?;
            pout(
                cli.json,
                serde_json::json!({"message":"init complete","path":path}),
                &format!("Wrote {}", path.display()),
            )?;
        }
        Commands::Origin {
            url,
            headers,
            location,
        } => {
            let headers = parse_headers(&headers)?;
            let origin = match location {
                Some(location) => resolve_origin(&redirect_context(&url, headers, &location)?)?,
                None => resolve_origin(&request_context(&url, headers)?)?,
            };
            pout(cli.json, serde_json::json!({"origin":origin}), &origin)?;
        }
        Commands::Cookies { url, headers } => {
            let req = request_context(&url, parse_headers(&headers)?)?;
            let secure = use_secure_cookies(&req);
            let policy = CookiePolicy::new(secure);

            let mut text = format!("secure cookies: {secure}");
            for (role, descriptor) in policy.iter() {
                let max_age = descriptor
                    .attributes()
                    .max_age
                    .map_or_else(|| "-".to_string(), |s| format!("{s}s"));
                let role = format!("{role:?}");
                text.push_str(&format!(
                    "\n  {role:<20} {:<36} max-age {max_age}",
                    descriptor.name()
                ));
            }
            pout(
                cli.json,
                serde_json::json!({"secure":secure,"cookies":policy}),
                &text,
            )?;
        }
        Commands::Reconcile { cookie, tenants } => {
            let headers = cookie_headers(cookie.as_deref())?;
            let rows: Vec<TenantRow> = tenants.into_iter().map(TenantRow::new).collect();
            let state = TenantCookieState::from_headers(&headers);
            let action = decide(&state, &rows);
            let set_cookie = action.set_cookie();
            pout(
                cli.json,
                serde_json::json!({"decision":action,"set_cookie":set_cookie}),
                set_cookie.as_deref().unwrap_or("tenant cookie unchanged"),
            )?;
        }
        Commands::Mint {
            url,
            headers,
            user_id,
            name,
            email,
            image,
        } => {
            let req = request_context(&url, parse_headers(&headers)?)?;
            let minter = SessionMinter::new(config.signing_secret(&EnvSecretStore))
                .with_max_age(config.session.max_age());
            let user = SessionUser {
                id: user_id,
                name,
                email,
                image,
            };
            let minted = minter.mint(&req, &user).await?;
            let expires = httpdate::fmt_http_date(minted.expires_at);
            pout(
                cli.json,
                serde_json::json!({
                    "cookie": minted.cookie,
                    "secure": minted.secure,
                    "expires": expires,
                }),
                &format!("{}\nexpires {expires}", minted.cookie),
            )?;
        }
    }

    Ok(())
}

fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "nile_auth={level},nile_config={level},nile_session={level}"
        ))
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let pos = s.find('=').ok_or_else(|| "must be KEY=VALUE".to_string())?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

fn pout(json_mode: bool, value: serde_json::Value, text: &str) -> anyhow::Result<()> {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{text}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_val_splits_on_first_equals() {
        assert_eq!(
            parse_key_val("niledb-origin=https://a.example.com?x=1"),
            Ok((
                "niledb-origin".to_string(),
                "https://a.example.com?x=1".to_string()
            ))
        );
        assert!(parse_key_val("no-equals").is_err());
    }

    #[test]
    fn cli_parses_reconcile() {
        let cli = Cli::try_parse_from([
            "nile-session",
            "reconcile",
            "--cookie",
            "nile.tenant=abc",
            "--tenant",
            "t1",
            "--tenant",
            "t2",
        ])
        .unwrap();
        match cli.command {
            Commands::Reconcile { cookie, tenants } => {
                assert_eq!(cookie.as_deref(), Some("nile.tenant=abc"));
                assert_eq!(tenants, ["t1", "t2"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn reconcile_takes_no_url() {
        assert!(
            Cli::try_parse_from(["nile-session", "reconcile", "--url", "http://localhost:3000"])
                .is_err()
        );
    }
}
