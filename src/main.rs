//! ndf-db CLI - Command-line interface for the NDF descriptor store

use anyhow::Context;
use clap::{ArgGroup, Parser, Subcommand};
use ndf_db::config::{self, NdfDbConfig};
use ndf_db::fixture::FixtureBuilder;
use ndf_db::storage::SqliteStore;
use ndf_db::ui::{self, Icons};
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "ndf-db")]
#[command(version)]
#[command(about = "Relational store for NDF descriptor objects")]
#[command(long_about = r#"
ndf-db keeps decoded NDF objects in a SQLite database:
  • Every property kind in its own value table
  • Nested lists, maps and pairs as a parent/position tree
  • Object and import references resolved in a separate pass

Example usage:
  ndf-db init
  ndf-db seed --count 16
  ndf-db objects --file 1
  ndf-db show --object 3
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the database file (overrides the config file)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a config file and create the database
    Init {
        /// Default game version for inserted files
        #[arg(long)]
        game_version: Option<String>,

        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Show statistics about the store
    Stats {
        #[arg(long)]
        json: bool,
    },

    /// Insert a generated file of sample objects and resolve its references
    Seed {
        /// Seed of the value generator
        #[arg(long, default_value = "1")]
        seed: u64,

        /// Number of objects
        #[arg(long, default_value = "8")]
        count: usize,

        /// Name prefix of the generated objects
        #[arg(long, default_value = "Descriptor_Unit")]
        prefix: String,

        /// Virtual path recorded for the file
        #[arg(long, default_value = "GameData/Generated/Gameplay/Gfx/UniteDescriptor.ndf")]
        vfs_path: String,

        /// Version label recorded for the file
        #[arg(long)]
        game_version: Option<String>,
    },

    /// List stored files
    Files {
        #[arg(long)]
        json: bool,
    },

    /// List the objects of a file
    Objects {
        /// File id
        #[arg(short, long)]
        file: i64,

        #[arg(long)]
        json: bool,
    },

    /// Decode an object with all of its properties
    Show {
        /// Object id
        #[arg(short, long)]
        object: i64,

        #[arg(long)]
        json: bool,
    },

    /// Resolve pending object references of a file and pending import references
    Resolve {
        /// File whose objects are the targets of object references
        #[arg(short, long)]
        file: i64,
    },

    /// Rename an object or change its export path
    #[command(group(ArgGroup::new("change").required(true).multiple(true).args(["name", "export_path"])))]
    Rename {
        /// Object id
        #[arg(short, long)]
        object: i64,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        export_path: Option<String>,
    },

    /// Change the value of a leaf property
    Set {
        /// Property id
        #[arg(short, long)]
        property: i64,

        /// New value in text form, e.g. `12.5` or `1.0, 2.0, 3.0`
        #[arg(long, allow_hyphen_values = true)]
        value: String,
    },

    /// Delete a file with its objects and properties
    DeleteFile {
        /// File id
        #[arg(short, long)]
        file: i64,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let config = config::load_config(Some(&config_path))
        .with_context(|| format!("failed to read config {}", config_path.display()))?
        .unwrap_or_default();
    let cwd = std::env::current_dir()?;
    let db_path = config.database_path(cli.database.as_deref(), &cwd);

    match cli.command {
        Commands::Init { game_version, force } => {
            let new_config = NdfDbConfig {
                database: Some(db_path.display().to_string()),
                game_version: game_version.or(config.game_version.clone()),
            };
            config::write_config(&config_path, &new_config, force)?;
            open_store(&db_path)?;

            ui::success("Initialized ndf-db");
            ui::status(Icons::FILE, "Config", &config_path.display().to_string());
            ui::status(Icons::DATABASE, "Database", &db_path.display().to_string());
        }

        Commands::Stats { json } => {
            let store = open_store(&db_path)?;
            let stats = store.stats()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                ui::header(&format!("Database {}", db_path.display()));
                println!("{}", ui::stats_table(&stats));
            }
        }

        Commands::Seed {
            seed,
            count,
            prefix,
            vfs_path,
            game_version,
        } => {
            anyhow::ensure!(count > 0, "--count must be at least 1");
            let mut store = open_store(&db_path)?;
            let version = config.game_version(game_version.as_deref()).to_string();
            let objects = FixtureBuilder::new(seed).objects(&prefix, count);

            store.begin_transaction()?;
            let file_id = match seed_file(&store, &vfs_path, &version, &objects) {
                Ok(file_id) => {
                    store.commit()?;
                    file_id
                }
                Err(e) => {
                    store.rollback()?;
                    ui::error(&format!("Seeding failed, nothing was written: {:#}", e));
                    return Err(e);
                }
            };

            let resolution = store.fix_references(file_id)?;
            ui::success(&format!("Seeded {} objects into file {}", objects.len(), file_id));
            print!("{}", resolution);
        }

        Commands::Files { json } => {
            let store = open_store(&db_path)?;
            let files = store.list_files()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&files)?);
            } else if files.is_empty() {
                ui::warn("No files stored");
            } else {
                println!("{}", ui::file_table(&files));
            }
        }

        Commands::Objects { file, json } => {
            let store = open_store(&db_path)?;
            let Some(ndf_file) = store.get_file(file)? else {
                anyhow::bail!("no file with id {}", file);
            };
            let objects = store.objects_in_file(file)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&objects)?);
            } else {
                ui::header(&format!("{} ({} objects)", ndf_file.vfs_path, objects.len()));
                println!("{}", ui::object_table(&objects));
                let classes = store.object_class_names(file)?;
                ui::summary_row("Classes:", &classes.join(", "));
            }
        }

        Commands::Show { object, json } => {
            let store = open_store(&db_path)?;
            let Some(ndf_object) = store.get_object(object)? else {
                anyhow::bail!("no object with id {}", object);
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&ndf_object)?);
            } else {
                ui::header(&format!("{} is {}", ndf_object.name, ndf_object.class_name));
                ui::info("Export path", &ndf_object.export_path);
                ui::section("Properties");
                for property in &ndf_object.properties {
                    print!("{}", ui::render_property(property, ui::theme()));
                }

                let referencing = store.objects_referencing(object)?;
                let importing = store.objects_importing(object)?;
                if !referencing.is_empty() || !importing.is_empty() {
                    ui::section("Referenced by");
                    ui::summary_row("Objects:", &join_ids(&referencing));
                    ui::summary_row("Imports:", &join_ids(&importing));
                }
            }
        }

        Commands::Resolve { file } => {
            let store = open_store(&db_path)?;
            let stats = store.fix_references(file)?;
            print!("{}", stats);
        }

        Commands::Rename {
            object,
            name,
            export_path,
        } => {
            let store = open_store(&db_path)?;
            if let Some(name) = name {
                anyhow::ensure!(store.change_object_name(object, &name)?, "no object with id {}", object);
                ui::success(&format!("Renamed object {} to {}", object, name));
            }
            if let Some(path) = export_path {
                anyhow::ensure!(store.change_export_path(object, &path)?, "no object with id {}", object);
                ui::success(&format!("Export path of object {} is now {}", object, path));
            }
        }

        Commands::Set { property, value } => {
            let store = open_store(&db_path)?;
            let Some(mut current) = store.get_property(property)? else {
                anyhow::bail!("no property with id {}", property);
            };
            let new_value = current.kind().parse_value(&value)?;
            store.change_value(property, &mut current, new_value)?;

            let shown = ui::format_value(&current.value).unwrap_or_default();
            ui::success(&format!("{} = {}", display_name(&current.name), shown));
        }

        Commands::DeleteFile { file } => {
            let store = open_store(&db_path)?;
            if store.delete_file(file)? {
                ui::status(Icons::DEL, "Deleted file", &file.to_string());
            } else {
                ui::warn(&format!("No file with id {}", file));
            }
        }
    }

    Ok(())
}

fn open_store(db_path: &Path) -> anyhow::Result<SqliteStore> {
    config::ensure_db_dir(db_path)?;
    SqliteStore::open(db_path).with_context(|| format!("failed to open database {}", db_path.display()))
}

fn seed_file(
    store: &SqliteStore,
    vfs_path: &str,
    version: &str,
    objects: &[ndf_db::NdfObject],
) -> anyhow::Result<i64> {
    let file_id = store.insert_file(vfs_path, "Generated.dat", vfs_path, version, true)?;
    for object in objects {
        store
            .insert_object(file_id, object)
            .with_context(|| format!("failed to insert {}", object.name))?;
    }
    Ok(file_id)
}

fn join_ids(ids: &[i64]) -> String {
    if ids.is_empty() {
        return ui::dim("none");
    }
    ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

fn display_name(name: &str) -> &str {
    if name.is_empty() { "(element)" } else { name }
}
