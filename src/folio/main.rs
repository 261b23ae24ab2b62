use clap::Parser;
use directories::ProjectDirs;
use folio::api::{ConfigAction, FolioApi, PrefsChange, ReadRequest, RemoteChoice};
use folio::config::{BrowserStyle, FolioConfig};
use folio::error::{FolioError, Result};
use folio::identity::fs::FsResolver;
use folio::model::{DeviceOrientation, Point, ScrollDirection};
use folio::reconcile::Reconciler;
use folio::remote::dir::DirMirror;
use folio::remote::ThreadDispatcher;
use folio::store::fs_backend::FsBackend;
use folio::store::record_store::RecordStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod args;
mod print;
use args::{Cli, Commands};
use print::{print_config, print_documents, print_messages, print_record};

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

struct AppContext {
    api: FolioApi<RecordStore<FsBackend>, FsResolver>,
    library_root: PathBuf,
    style: BrowserStyle,
}

fn run(cli: Cli) -> Result<()> {
    let mut ctx = init_context()?;

    match cli.command {
        Some(Commands::List) | None => handle_list(&mut ctx),
        Some(Commands::Show { path }) => handle_show(&mut ctx, &path),
        Some(Commands::Read {
            path,
            page,
            offset,
            zoom,
            landscape,
            accept_remote,
            keep_local,
        }) => {
            let remote = if accept_remote {
                RemoteChoice::Accept
            } else if keep_local {
                RemoteChoice::Keep
            } else {
                RemoteChoice::Ask
            };
            let request = ReadRequest {
                page: page.map(|p| (p - 1) as usize),
                offset: offset.as_deref().map(parse_offset).transpose()?,
                zoom,
                orientation: if landscape {
                    DeviceOrientation::Landscape
                } else {
                    DeviceOrientation::Portrait
                },
                remote,
                ..ReadRequest::default()
            };
            handle_read(&mut ctx, &path, request)
        }
        Some(Commands::Prefs {
            path,
            direction,
            two_up,
            find,
            locked,
        }) => {
            let direction = direction
                .as_deref()
                .map(|d| d.parse::<ScrollDirection>())
                .transpose()
                .map_err(FolioError::InvalidArgument)?;
            let change = PrefsChange {
                direction,
                two_up: two_up.map(bool::from),
                find_on_page: find.map(bool::from),
                allows_document_assembly: !locked,
                ..PrefsChange::default()
            };
            handle_prefs(&mut ctx, &path, change)
        }
        Some(Commands::Forget { path }) => handle_forget(&mut ctx, &path),
        Some(Commands::Doctor) => handle_doctor(&mut ctx),
        Some(Commands::Config { key, value }) => handle_config(&ctx, key, value),
    }
}

fn data_dir() -> Result<PathBuf> {
    if let Some(home) = std::env::var_os("FOLIO_HOME") {
        return Ok(PathBuf::from(home));
    }
    ProjectDirs::from("com", "folio", "folio")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| FolioError::Config("Could not determine data directory".to_string()))
}

fn init_context() -> Result<AppContext> {
    let data_dir = data_dir()?;
    let cwd = std::env::current_dir()?;

    let config = FolioConfig::load(&data_dir).unwrap_or_else(|e| {
        log::warn!("ignoring unreadable config in {}: {}", data_dir.display(), e);
        FolioConfig::default()
    });
    let library_root = config.library_root.clone().unwrap_or_else(|| cwd.clone());
    log::debug!(
        "data in {}, library at {}",
        data_dir.display(),
        library_root.display()
    );

    let store = RecordStore::with_backend(FsBackend::new(data_dir.clone()));
    let resolver = FsResolver::new(library_root.clone());
    let mut engine = Reconciler::new(store, resolver, config.device_label());
    if let Some(mirror_dir) = &config.mirror_dir {
        engine = engine.with_remote(
            Arc::new(DirMirror::new(mirror_dir.clone())),
            Box::new(ThreadDispatcher),
        );
    }

    let api = FolioApi::new(engine, data_dir).with_cwd(cwd);
    Ok(AppContext {
        api,
        library_root: std::fs::canonicalize(&library_root).unwrap_or(library_root),
        style: config.browser_style,
    })
}

fn handle_list(ctx: &mut AppContext) -> Result<()> {
    let result = ctx.api.list_documents()?;
    print_documents(&result.documents, &ctx.library_root, ctx.style);
    print_messages(&result.messages);
    Ok(())
}

fn handle_show(ctx: &mut AppContext, path: &Path) -> Result<()> {
    let result = ctx.api.show_document(path)?;
    if let (Some(record), Some(location)) = (&result.record, &result.location) {
        print_record(record, location);
    }
    print_messages(&result.messages);
    Ok(())
}

fn handle_read(ctx: &mut AppContext, path: &Path, request: ReadRequest) -> Result<()> {
    let result = ctx.api.read_document(path, request)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_prefs(ctx: &mut AppContext, path: &Path, change: PrefsChange) -> Result<()> {
    let result = ctx.api.change_preferences(path, change)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_forget(ctx: &mut AppContext, path: &Path) -> Result<()> {
    let result = ctx.api.forget_document(path)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_doctor(ctx: &mut AppContext) -> Result<()> {
    let result = ctx.api.doctor()?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_config(ctx: &AppContext, key: Option<String>, value: Option<String>) -> Result<()> {
    let action = match (key, value) {
        (None, _) => ConfigAction::ShowAll,
        (Some(key), None) => ConfigAction::ShowKey(key),
        (Some(key), Some(value)) => ConfigAction::Set(key, value),
    };

    let result = ctx.api.config(action)?;
    if let (Some(config), true) = (&result.config, result.messages.is_empty()) {
        print_config(config);
    }
    print_messages(&result.messages);
    Ok(())
}

fn parse_offset(s: &str) -> Result<Point> {
    let invalid = || FolioError::InvalidArgument(format!("Offset must look like X,Y: {}", s));
    let (x, y) = s.split_once(',').ok_or_else(invalid)?;
    let x = x.trim().parse::<f64>().map_err(|_| invalid())?;
    let y = y.trim().parse::<f64>().map_err(|_| invalid())?;
    Ok(Point::new(x, y))
}
