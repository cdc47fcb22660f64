//! Richdoc - rich-text listings for an app store, from the terminal.
//!
//! # Usage
//!
//! ```bash
//! richdoc view description.html --watch
//! richdoc create --name "Orbit" --html description.html
//! richdoc edit app-1
//! richdoc edit app-1 --step "select 0 5" --step bold --step "wait 1000"
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use richdoc::app::App;
use richdoc::config::{
    clear_config_flags, global_config_path, load_config_flags, local_override_path,
    parse_flag_tokens, save_config_flags, ConfigFlags, ThemeMode,
};
use richdoc::document::{deserialize, serialize};
use richdoc::editor::{parse_script, parse_step, CommandOutcome, ManualClock, Step, SystemClock};
use richdoc::host::EditorHost;
use richdoc::render::{plain_text, render_read_only};
use richdoc::store::{
    upload_file, ContentStore, DirBlobStore, EnvAuth, JsonFileStore, NewApplication, RecordId,
};

/// Rich-text listings for an app store
#[derive(Parser, Debug)]
#[command(name = "richdoc", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Cmd>,

    /// Quiet period before an edit is saved, in milliseconds
    #[arg(long, global = true, value_name = "MS")]
    debounce_ms: Option<u64>,

    /// Undo steps kept per session
    #[arg(long, global = true, value_name = "N")]
    history_limit: Option<usize>,

    /// Highest heading level the editor offers
    #[arg(long, global = true, value_name = "LEVEL")]
    max_heading: Option<u8>,

    /// Record store file
    #[arg(long, global = true, value_name = "PATH")]
    store: Option<PathBuf>,

    /// Directory uploaded images are written to
    #[arg(long, global = true, value_name = "PATH")]
    blob_dir: Option<PathBuf>,

    /// URL prefix uploaded images are served from
    #[arg(long, global = true, value_name = "URL")]
    public_url: Option<String>,

    /// Watch file for changes and auto-reload
    #[arg(short, long, global = true)]
    watch: bool,

    /// Color theme for the terminal UI
    #[arg(long, global = true, value_enum)]
    theme: Option<ThemeMode>,

    /// Save current command-line flags as defaults
    #[arg(long)]
    save: bool,

    /// Clear saved defaults
    #[arg(long)]
    clear: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Page through a markup file
    View {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Print a markup file in canonical form
    Normalize {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Print the document tree of a markup file as JSON
    Tree {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Create an application record
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Markup file for the long description
        #[arg(long, value_name = "FILE")]
        html: Option<PathBuf>,
    },
    /// Print a record's long description as text
    Show {
        #[arg(value_name = "ID")]
        id: String,
    },
    /// Edit a record's long description
    Edit {
        #[arg(value_name = "ID")]
        id: String,
        /// Run one script step instead of opening the editor (repeatable)
        #[arg(long = "step", value_name = "STEP")]
        steps: Vec<String>,
        /// Run the steps in a script file instead of opening the editor
        #[arg(long, value_name = "FILE", conflicts_with = "steps")]
        script: Option<PathBuf>,
    },
    /// Upload an image and print its public URL
    Upload {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn open_host(flags: &ConfigFlags, clock: Box<dyn richdoc::editor::Clock>) -> EditorHost {
    EditorHost::new(
        Box::new(JsonFileStore::new(flags.store_path())),
        Box::new(DirBlobStore::new(flags.blob_dir(), flags.public_url())),
        Box::new(EnvAuth::default()),
        clock,
        flags.host_config(),
    )
}

fn run_steps(flags: &ConfigFlags, id: &RecordId, steps: Vec<Step>) -> Result<()> {
    let clock = ManualClock::new();
    let mut host = open_host(flags, Box::new(clock.clone()));
    host.mount(id).with_context(|| format!("Failed to open {id}"))?;

    for (index, step) in steps.into_iter().enumerate() {
        let outcome = match step {
            Step::Command(command) => host.dispatch(command)?,
            Step::UploadImage(path) => host
                .insert_image_file(&path)
                .with_context(|| format!("Failed to insert {}", path.display()))?,
            Step::Wait(ms) => {
                clock.advance(ms);
                host.tick();
                CommandOutcome::Unchanged
            }
        };
        match outcome {
            CommandOutcome::Rejected(reason) => eprintln!("[warn] step {}: {reason}", index + 1),
            CommandOutcome::NothingToUndo => eprintln!("[info] step {}: nothing to undo", index + 1),
            CommandOutcome::NothingToRedo => eprintln!("[info] step {}: nothing to redo", index + 1),
            CommandOutcome::Applied | CommandOutcome::Unchanged => {}
        }
    }

    let html = host.unmount();
    for notice in host.take_notices() {
        eprintln!("[{:?}] {}", notice.level, notice.message);
    }
    let label = host.status().label();
    if !label.is_empty() {
        eprintln!("{label}");
    }
    if let Some(html) = html {
        println!("{html}");
    }
    Ok(())
}

fn run_command(command: Cmd, flags: &ConfigFlags, global_path: PathBuf, local_path: PathBuf) -> Result<()> {
    let local_path = local_path.exists().then_some(local_path);
    match command {
        Cmd::View { file } => {
            if !file.exists() {
                anyhow::bail!("File not found: {}", file.display());
            }
            let source = read_source(&file)?;
            App::viewer(file, source)
                .with_watch(flags.watch)
                .with_theme(flags.theme())
                .with_config_paths(Some(global_path), local_path)
                .run()
                .context("Application error")
        }
        Cmd::Normalize { file } => {
            println!("{}", serialize(&deserialize(&read_source(&file)?)));
            Ok(())
        }
        Cmd::Tree { file } => {
            let doc = deserialize(&read_source(&file)?);
            println!("{}", serde_json::to_string_pretty(&doc)?);
            Ok(())
        }
        Cmd::Create {
            name,
            description,
            html,
        } => {
            let long_description = match html {
                Some(path) => serialize(&deserialize(&read_source(&path)?)),
                None => String::new(),
            };
            let mut store = JsonFileStore::new(flags.store_path());
            let id = store.create(NewApplication {
                name,
                description,
                long_description,
                ..NewApplication::default()
            })?;
            println!("{id}");
            Ok(())
        }
        Cmd::Show { id } => {
            let id = RecordId::new(id);
            let store = JsonFileStore::new(flags.store_path());
            let app = store
                .read(&id)?
                .with_context(|| format!("Application {id} not found"))?;
            println!("{}\n", app.name);
            println!("{}", plain_text(&render_read_only(&deserialize(&app.long_description))));
            Ok(())
        }
        Cmd::Edit { id, steps, script } => {
            let id = RecordId::new(id);
            let steps = match script {
                Some(path) => Some(parse_script(&read_source(&path)?)?),
                None if steps.is_empty() => None,
                None => Some(
                    steps
                        .iter()
                        .map(|line| parse_step(line))
                        .collect::<Result<Vec<_>, _>>()?,
                ),
            };
            if let Some(steps) = steps {
                return run_steps(flags, &id, steps);
            }
            let mut host = open_host(flags, Box::new(SystemClock::new()));
            host.mount(&id).with_context(|| format!("Failed to open {id}"))?;
            App::editor(host)
                .with_theme(flags.theme())
                .with_config_paths(Some(global_path), local_path)
                .run()
                .context("Application error")
        }
        Cmd::Upload { file } => {
            let bytes = std::fs::read(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let file_name = file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            let mut blobs = DirBlobStore::new(flags.blob_dir(), flags.public_url());
            println!("{}", upload_file(&mut blobs, &file_name, &bytes)?);
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let raw_args = std::env::args().collect::<Vec<_>>();
    let cli = Cli::parse();
    let global_path = global_config_path();
    let local_path = local_override_path();
    let cli_flags = parse_flag_tokens(&raw_args);

    if cli.clear {
        clear_config_flags(&global_path)?;
    }
    if cli.save {
        save_config_flags(&global_path, &cli_flags)?;
    }

    let file_flags = if cli.clear {
        ConfigFlags::default()
    } else {
        let global_flags = load_config_flags(&global_path)?;
        let local_flags = load_config_flags(&local_path)?;
        global_flags.union(&local_flags)
    };
    let effective = file_flags.union(&cli_flags);

    match cli.command {
        Some(command) => run_command(command, &effective, global_path, local_path),
        None if cli.save || cli.clear => Ok(()),
        None => anyhow::bail!("No command given; see `richdoc --help`"),
    }
}
