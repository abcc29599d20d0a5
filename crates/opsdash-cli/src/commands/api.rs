//! Raw API call command implementation.

use anyhow::{Context, Result, bail};
use clap::{Args, ValueEnum};
use serde_json::Value;

use opsdash_core::{Method, RequestConfig};

use crate::output;
use crate::session::{self, storage};

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl From<HttpMethod> for Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Method::Get,
            HttpMethod::Post => Method::Post,
            HttpMethod::Put => Method::Put,
            HttpMethod::Patch => Method::Patch,
            HttpMethod::Delete => Method::Delete,
        }
    }
}

#[derive(Args, Debug)]
pub struct ApiArgs {
    /// HTTP method
    #[arg(value_enum)]
    pub method: HttpMethod,

    /// Endpoint path, e.g. /servers
    pub path: String,

    /// JSON request body
    #[arg(long)]
    pub body: Option<String>,

    /// Extra request header as NAME:VALUE (repeatable)
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Fail on 401 instead of refreshing the session
    #[arg(long)]
    pub no_refresh: bool,

    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected NAME:VALUE, got '{}'", raw))?;

    let name = name.trim();
    if name.is_empty() {
        return Err(format!("header name is empty in '{}'", raw));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

fn build_request(args: &ApiArgs) -> Result<RequestConfig> {
    let body: Option<Value> = args
        .body
        .as_deref()
        .map(|raw| serde_json::from_str(raw))
        .transpose()
        .context("--body is not valid JSON")?;

    let mut config = match (args.method, body) {
        (HttpMethod::Get, Some(_)) => bail!("GET requests cannot carry a body"),
        (HttpMethod::Post, Some(body)) => RequestConfig::post(body),
        (HttpMethod::Put, Some(body)) => RequestConfig::put(body),
        (HttpMethod::Patch, Some(body)) => RequestConfig::patch(body),
        (method, Some(body)) => RequestConfig::new(method.into()).with_json(body),
        (method, None) => RequestConfig::new(method.into()),
    };

    for (name, value) in &args.headers {
        config.set_header(name, value);
    }

    if args.no_refresh {
        config = config.skip_token_refresh();
    }

    Ok(config)
}

pub async fn run(args: ApiArgs, config: &storage::SessionConfig) -> Result<()> {
    let request = build_request(&args)?;
    let client = storage::open_client(config)?;
    let mut events = client.subscribe();

    let result: opsdash_core::Result<Value> = client.call(&args.path, request).await;
    session::report_expiry(&mut events);

    let value = result.with_context(|| format!("{} {} failed", args.method_name(), args.path))?;

    if value.is_null() {
        return Ok(());
    }
    if args.pretty {
        output::json_pretty(&value)
    } else {
        output::json(&value)
    }
}

impl ApiArgs {
    fn method_name(&self) -> &'static str {
        Method::from(self.method).as_str()
    }
}
