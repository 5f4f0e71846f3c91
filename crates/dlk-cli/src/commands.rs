use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use colored::Colorize;
use dlk_kernel::{DataObject, KernelConfig, KernelMode, Session, Workspace, WorkspaceStatus};
use dlk_pack::{with_default_extension, WorkspaceReader, WorkspaceWriter};
use dlk_server::{PeerHost, ServerConfig};
use serde::Serialize;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    match cli.command {
        Command::Status(args) => cmd_status(args, format),
        Command::Inspect(args) => cmd_inspect(args, format),
        Command::Push(args) => cmd_push(args, format),
        Command::Export(args) => cmd_export(args, format),
        Command::Serve(args) => cmd_serve(args),
    }
}

fn kernel_config(args: &KernelArgs) -> anyhow::Result<KernelConfig> {
    let config = match &args.kernel_config {
        Some(path) => KernelConfig::load(path)?,
        None => KernelConfig::from_env()?,
    };
    Ok(config)
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_status(status: &WorkspaceStatus) {
    println!("Mode: {}", status.mode.to_string().yellow().bold());
    println!("Backend: {}", status.backend.to_string().cyan());
    if let Some(url) = &status.url {
        println!("Peer: {}", url.blue());
    }
    println!("Objects: {}", status.object_count.to_string().bold());
}

// ---- status ----

fn cmd_status(args: StatusArgs, format: OutputFormat) -> anyhow::Result<()> {
    let session = Session::start(kernel_config(&args.kernel)?)?;
    let status = session.workspace().status()?;
    match format {
        OutputFormat::Json => print_json(&status),
        OutputFormat::Text => {
            println!("{}", session.banner().bold());
            print_status(&status);
            Ok(())
        }
    }
}

// ---- inspect ----

/// One entry of a workspace file, as listed by `inspect`.
#[derive(Debug, PartialEq, Serialize)]
struct EntrySummary {
    name: String,
    kind: String,
    shape: String,
    rois: usize,
}

impl EntrySummary {
    fn new(name: String, object: &DataObject) -> Self {
        Self {
            name,
            kind: object.kind().to_string(),
            shape: object.describe(),
            rois: object.rois().len(),
        }
    }
}

/// The path as given when it exists, otherwise with the default extension.
fn existing_file(path: &Path) -> PathBuf {
    if path.exists() {
        path.to_path_buf()
    } else {
        with_default_extension(path)
    }
}

fn inventory(path: &Path) -> anyhow::Result<(String, Vec<EntrySummary>)> {
    let path = existing_file(path);
    let reader = WorkspaceReader::open(&path)
        .with_context(|| format!("cannot read workspace file {}", path.display()))?;
    let entries = reader
        .objects()?
        .into_iter()
        .map(|(name, object)| EntrySummary::new(name, &object))
        .collect();
    Ok((reader.format_version().to_string(), entries))
}

fn cmd_inspect(args: InspectArgs, format: OutputFormat) -> anyhow::Result<()> {
    let (version, entries) = inventory(&args.file)?;
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "format_version": version,
            "entries": entries,
        })),
        OutputFormat::Text => {
            println!("{} (format {})", args.file.display().to_string().bold(), version);
            if entries.is_empty() {
                println!("  No entries.");
            }
            for entry in &entries {
                let rois = match entry.rois {
                    0 => String::new(),
                    n => format!(" {n} roi(s)").dimmed().to_string(),
                };
                println!("  {}  {}{}", entry.name.yellow(), entry.shape.cyan(), rois);
            }
            Ok(())
        }
    }
}

// ---- push ----

/// Load `file` into a standalone workspace, then move it to the peer:
/// the web API when a URL is given or configured, the RPC peer otherwise.
fn push(file: &Path, url: Option<&str>, token: Option<&str>, config: KernelConfig) -> anyhow::Result<Workspace> {
    let use_web = url.is_some() || config.web_api().is_some();
    let ws = Workspace::discover(config.with_mode(KernelMode::Standalone))?;
    ws.load(file)?;

    let moved = if use_web { ws.connect(url, token)? } else { ws.resync()? };
    if !moved {
        bail!("no peer reachable, {} entries left unsent", ws.len()?);
    }
    Ok(ws)
}

fn cmd_push(args: PushArgs, format: OutputFormat) -> anyhow::Result<()> {
    let config = kernel_config(&args.kernel)?;
    let ws = push(&args.file, args.url.as_deref(), args.token.as_deref(), config)?;
    let status = ws.status()?;
    match format {
        OutputFormat::Json => print_json(&status),
        OutputFormat::Text => {
            println!(
                "{} Pushed {} to the {} peer",
                "✓".green().bold(),
                args.file.display().to_string().bold(),
                status.backend.to_string().cyan()
            );
            print_status(&status);
            Ok(())
        }
    }
}

// ---- export ----

/// Write every entry of `ws` to `path`. Returns the path written and the
/// number of entries.
fn export(ws: &Workspace, path: &Path) -> anyhow::Result<(PathBuf, usize)> {
    let mut writer = WorkspaceWriter::new();
    let names = ws.list()?;
    for name in &names {
        writer.add_object(name, &ws.get(name)?)?;
    }
    let written = writer.finish(path)?;
    Ok((written, names.len()))
}

fn cmd_export(args: ExportArgs, format: OutputFormat) -> anyhow::Result<()> {
    let session = Session::start(kernel_config(&args.kernel)?)?;
    let (written, count) = export(session.workspace(), &args.file)?;
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "path": written,
            "entries": count,
        })),
        OutputFormat::Text => {
            println!(
                "{} Exported {} entries from {} workspace to {}",
                "✓".green().bold(),
                count.to_string().bold(),
                session.workspace().mode(),
                written.display().to_string().bold()
            );
            Ok(())
        }
    }
}

// ---- serve ----

fn server_config(args: &ServeArgs) -> anyhow::Result<ServerConfig> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(addr) = args.http {
        config.http_addr = Some(addr);
    }
    if let Some(addr) = args.rpc {
        config.rpc_addr = Some(addr);
    }
    if let Some(token) = &args.token {
        config.token = Some(token.clone());
    }
    Ok(config)
}

fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = server_config(&args)?;
    let endpoint = |addr: Option<std::net::SocketAddr>| match addr {
        Some(addr) => addr.to_string().bold().to_string(),
        None => "disabled".dimmed().to_string(),
    };
    println!("DataLab peer host");
    println!("  Web API: {}", endpoint(config.http_addr));
    println!("  RPC:     {}", endpoint(config.rpc_addr));

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(PeerHost::new(config).serve())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dlk_kernel::{Grid, Image, ObjectKind, Roi, Signal};

    fn write_sample(path: &Path) -> PathBuf {
        let signal: DataObject = Signal::new("sig", vec![0.0, 1.0, 2.0], vec![1.0, 2.0, 3.0])
            .unwrap()
            .into();
        let mut image = Image::new("img", Grid::filled(4, 5, 0.5));
        image.rois.push(Roi::new("rectangle", vec![0.0, 0.0, 2.0, 2.0]));
        let mut writer = WorkspaceWriter::new();
        writer.add_object("sig", &signal).unwrap();
        writer.add_object("img", &image.into()).unwrap();
        writer.finish(path).unwrap()
    }

    fn standalone() -> Workspace {
        let config = KernelConfig::default().with_mode(KernelMode::Standalone);
        Workspace::discover(config).unwrap()
    }

    // ---- inspect ----

    #[test]
    fn inventory_lists_entries() {
        let dir = tempfile::tempdir().unwrap();
        write_sample(&dir.path().join("sample.dlw"));

        let (_, entries) = inventory(&dir.path().join("sample.dlw")).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "img");
        assert_eq!(entries[0].kind, ObjectKind::Image.to_string());
        assert_eq!(entries[0].shape, "image[4x5]");
        assert_eq!(entries[0].rois, 1);
        assert_eq!(entries[1].shape, "signal[3]");
    }

    #[test]
    fn inventory_adds_default_extension() {
        let dir = tempfile::tempdir().unwrap();
        write_sample(&dir.path().join("sample"));
        let (_, entries) = inventory(&dir.path().join("sample")).unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn inventory_of_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(inventory(&dir.path().join("absent.dlw")).is_err());
    }

    // ---- export ----

    #[test]
    fn export_round_trips_through_inspect() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_sample(&dir.path().join("in.dlw"));
        let ws = standalone();
        ws.load(&source).unwrap();

        let (written, count) = export(&ws, &dir.path().join("out")).unwrap();
        assert_eq!(count, 2);
        assert_eq!(written, dir.path().join("out.dlw"));
        let (_, entries) = inventory(&written).unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["img", "sig"]);
    }

    #[test]
    fn export_empty_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let (written, count) = export(&standalone(), &dir.path().join("empty.dlw")).unwrap();
        assert_eq!(count, 0);
        assert!(inventory(&written).unwrap().1.is_empty());
    }

    // ---- push ----

    #[test]
    fn push_without_peer_fails() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_sample(&dir.path().join("in.dlw"));
        // bind then drop to get a port with nothing listening
        let port = std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
        let config = KernelConfig {
            connect_timeout_ms: 300,
            ..KernelConfig::default()
        }
        .with_proxy_addr(format!("127.0.0.1:{port}"));

        let err = push(&source, None, None, config).unwrap_err();
        assert!(err.to_string().contains("2 entries left unsent"));
    }

    // ---- serve ----

    #[test]
    fn serve_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.toml");
        std::fs::write(&path, "http_addr = \"127.0.0.1:7000\"\ntoken = \"file\"\n").unwrap();
        let args = ServeArgs {
            http: None,
            rpc: Some("127.0.0.1:7001".parse().unwrap()),
            token: Some("flag".into()),
            config: Some(path),
        };
        let config = server_config(&args).unwrap();
        assert_eq!(config.http_addr, Some("127.0.0.1:7000".parse().unwrap()));
        assert_eq!(config.rpc_addr, Some("127.0.0.1:7001".parse().unwrap()));
        assert_eq!(config.token.as_deref(), Some("flag"));
    }
}
