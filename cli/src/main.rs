mod settings;

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use storeapi_core::{ApiResponse, Client, ClientError, HttpMethod, ResponseBody, ResponseHeaders};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::settings::AppConfig;

#[derive(Parser)]
#[command(name = "storeapi", about = "Call a store API from the command line", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Exchange an OAuth2 authorization code for an access token
    Token {
        #[arg(long)]
        code: String,

        #[arg(long)]
        scope: String,

        #[arg(long)]
        redirect_uri: String,
    },

    /// Call an API endpoint and print the response body
    Call {
        /// GET, POST, PUT or DELETE
        method: HttpMethod,

        /// Path below the store context, e.g. v3/catalog/products
        path: String,

        /// Request parameter as key=value (value parsed as JSON when it can be)
        #[arg(short = 'p', long = "param", value_parser = parse_param)]
        params: Vec<(String, Value)>,

        /// Request parameters as a JSON object
        #[arg(long, conflicts_with = "params")]
        json: Option<String>,

        /// Print the status line and headers before the body
        #[arg(short, long)]
        include: bool,
    },
}

fn parse_param(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{raw}`"))?;
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "storeapi=warn,storeapi_core=warn",
        1 => "storeapi=info,storeapi_core=debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let config = AppConfig::load()?;
    let mut client = Client::with_config(config.credentials(), config.client.clone());

    match cli.command {
        Command::Token {
            code,
            scope,
            redirect_uri,
        } => match client.get_access_token(&code, &scope, &redirect_uri) {
            Some(token) => {
                info!("Token exchange succeeded for {}", config.store.context);
                println!("{token}");
            }
            None => {
                eprintln!("token exchange failed (run with -v for details)");
                return Ok(ExitCode::FAILURE);
            }
        },

        Command::Call {
            method,
            path,
            params,
            json,
            include,
        } => {
            let params: Map<String, Value> = match json {
                Some(raw) => serde_json::from_str(&raw)?,
                None => params.into_iter().collect(),
            };

            match client.call(method, &path, &params) {
                Ok(ApiResponse { headers, body }) => {
                    if include {
                        print_headers(&headers);
                    }
                    print_body(&body)?;
                }
                Err(ClientError::Api(err)) => {
                    eprintln!("{} {} failed: {}", err.method, err.path, err);
                    if include {
                        print_headers(&err.headers);
                    }
                    print_body(&err.body)?;
                    return Ok(ExitCode::FAILURE);
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn print_headers(headers: &ResponseHeaders) {
    println!("{} {}", headers.status_code, headers.status_message);
    for (name, value) in &headers.fields {
        println!("{name}: {value}");
    }
    println!();
}

fn print_body(body: &ResponseBody) -> Result<()> {
    match body {
        ResponseBody::Json(value) => println!("{}", serde_json::to_string_pretty(value)?),
        ResponseBody::Raw(text) if text.is_empty() => {}
        ResponseBody::Raw(text) => println!("{text}"),
    }
    Ok(())
}
