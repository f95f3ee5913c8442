use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use url::Url;

use helix_forms::api::create_router;
use helix_forms::core::{ConfigResolver, FormWrapper};
use helix_forms::error::{FormError, Result};
use helix_forms::models::{ContainerVisibility, FormMethod, ScrollAfter, WrapperProps};
use helix_forms::storage::{load_props, Storage};
use helix_forms::tui;

#[derive(Parser)]
#[command(name = "helix-forms", version, about = "Remote form wrapper")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 在终端里挂载一个远程表单
    Form(FormArgs),
    /// 提供 /.well-known/public_data.json
    ServeConfig {
        /// 配置文档 JSON 文件
        #[arg(long, default_value = "public_data.json")]
        file: PathBuf,
        #[arg(long, default_value = "127.0.0.1:3000")]
        addr: String,
    },
}

#[derive(Args)]
struct FormArgs {
    /// 组件参数 JSON 文件（camelCase 键）
    #[arg(long)]
    props: Option<PathBuf>,
    /// 页面 origin，根相对端点和配置文档都基于它解析
    #[arg(long, default_value = "http://127.0.0.1:3000")]
    origin: String,
    #[arg(long)]
    config_token: Option<String>,
    #[arg(long)]
    client_environment: Option<String>,
    #[arg(long)]
    api_endpoint_url: Option<String>,
    #[arg(long)]
    submission_endpoint_url: Option<String>,
    #[arg(long)]
    method: Option<FormMethod>,
    #[arg(long)]
    container_visibility: Option<ContainerVisibility>,
    #[arg(long)]
    scroll_after: Option<ScrollAfter>,
    #[arg(long)]
    show_form_on_success: bool,
    #[arg(long)]
    analytics_name: Option<String>,
}

impl FormArgs {
    /// 文件参数为底，命令行覆盖
    fn props(&self) -> Result<WrapperProps> {
        let mut props = match &self.props {
            Some(path) => load_props(path)?,
            None => WrapperProps::default(),
        };
        if let Some(v) = &self.config_token {
            props.config_token = Some(v.clone());
        }
        if let Some(v) = &self.client_environment {
            props.client_environment = Some(v.clone());
        }
        if let Some(v) = &self.api_endpoint_url {
            props.api_endpoint_url = Some(v.clone());
        }
        if let Some(v) = &self.submission_endpoint_url {
            props.submission_endpoint_url = Some(v.clone());
        }
        if let Some(v) = self.method {
            props.method = v;
        }
        if let Some(v) = self.container_visibility {
            props.container_visibility = v;
        }
        if let Some(v) = self.scroll_after {
            props.scroll_after = v;
        }
        if self.show_form_on_success {
            props.show_form_on_success = true;
        }
        if let Some(v) = &self.analytics_name {
            props.analytics_name = v.clone();
        }
        Ok(props)
    }
}

fn main() {
    // 日志写 stderr，不干扰 TUI 画面
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Form(args) => run_form(&args),
        Command::ServeConfig { file, addr } => serve_config(file, &addr),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run_form(args: &FormArgs) -> Result<()> {
    let props = args.props()?;
    let origin = Url::parse(&args.origin)
        .map_err(|e| FormError::InvalidUrl(format!("{}: {}", args.origin, e)))?;

    let runtime = tokio::runtime::Runtime::new()?;
    let client = reqwest::Client::new();
    let resolver = Arc::new(ConfigResolver::new(client.clone(), &origin)?);
    let (wrapper, events) = FormWrapper::new(props, resolver, client, origin);
    runtime.block_on(wrapper.mount());

    let mut app = tui::App::new(Arc::new(wrapper), events, runtime.handle().clone());
    app.run()?;
    Ok(())
}

fn serve_config(file: PathBuf, addr: &str) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let storage = Storage::load(&file)?;
        let router = create_router(Arc::new(tokio::sync::RwLock::new(storage)));
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("serving {} on {}", file.display(), addr);
        axum::serve(listener, router).await?;
        Ok::<(), FormError>(())
    })
}
