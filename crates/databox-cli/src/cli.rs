//! databox CLI.

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use tabled::{Table, Tabled};

use databox::{BoxStore, DataBoxError, EngineConfig, OutputStream};

/// databox - data-only container management
#[derive(Parser)]
#[command(name = "databox")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Engine host URL (`unix://...` or `tcp://...`)
    #[arg(
        long,
        env = "DOCKER_HOST",
        default_value = "unix:///var/run/docker.sock",
        global = true
    )]
    pub docker_host: String,

    /// Directory containing cert.pem, key.pem, and ca.pem for TLS over TCP
    #[arg(long, env = "DOCKER_CERT_PATH", global = true)]
    pub cert_path: Option<PathBuf>,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// databox commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Manage data-only boxes
    Box {
        /// Box operation; lists boxes when omitted
        #[command(subcommand)]
        command: Option<BoxCommands>,
    },

    /// Manage bundles
    Bundle,
}

/// Box operations.
#[derive(Subcommand)]
pub enum BoxCommands {
    /// Create a new box with an empty volume mounted at VOLUME
    Create {
        /// Base image for the box container
        #[arg(short, long)]
        image: Option<String>,

        /// Box name
        name: String,

        /// Volume path inside the box
        volume: String,
    },

    /// Remove a box and its volumes
    Rm {
        /// Box name
        name: String,
    },

    /// List boxes, or the files inside one
    Ls {
        /// Box name; lists all boxes when omitted
        name: Option<String>,
    },

    /// Execute a command inside a box
    Exec {
        /// Box name
        name: String,

        /// Command and arguments
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        command: Vec<String>,
    },

    /// Copy files between SRC and DST
    ///
    /// Both arguments accept a local path in the form <path> or a box path
    /// in the form <box-name>:<path>.
    Cp {
        /// Copy source
        src: String,

        /// Copy destination
        dst: String,
    },
}

#[derive(Tabled)]
struct BoxRow {
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "PATH")]
    path: String,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Surfaces every repository and engine error unchanged; there is no
    /// retry or local recovery.
    pub async fn execute(self) -> Result<()> {
        let Commands::Box { command } = self.command else {
            return Err(DataBoxError::Unimplemented { feature: "Bundles" }.into());
        };

        let engine = EngineConfig::new(&self.docker_host, self.cert_path).connect()?;
        let store = BoxStore::new(engine);

        match command {
            None | Some(BoxCommands::Ls { name: None }) => list_boxes(&store).await,

            Some(BoxCommands::Ls { name: Some(name) }) => {
                let bx = store.find(&name).await?;
                let stream = store
                    .run(&bx, vec!["/bin/ls".to_string(), "-al".to_string()])
                    .await?;
                drain(stream).await
            }

            Some(BoxCommands::Create {
                image,
                name,
                volume,
            }) => {
                let bx = store.create(&name, &volume, image.as_deref()).await?;
                println!("{}", bx.name());
                Ok(())
            }

            Some(BoxCommands::Rm { name }) => {
                let bx = store.find(&name).await?;
                store.delete(&bx).await?;
                Ok(())
            }

            Some(BoxCommands::Exec { name, command }) => {
                let bx = store.find(&name).await?;
                let stream = store.run(&bx, command).await?;
                drain(stream).await
            }

            Some(BoxCommands::Cp { src, dst }) => {
                let stream = store.copy(&src, &dst).await?;
                drain(stream).await
            }
        }
    }
}

/// Print the NAME/PATH table of all boxes.
async fn list_boxes(store: &BoxStore) -> Result<()> {
    let boxes = store.list().await?;
    if boxes.is_empty() {
        println!("No boxes found");
        return Ok(());
    }

    let rows: Vec<BoxRow> = boxes
        .iter()
        .map(|bx| BoxRow {
            name: bx.name().to_string(),
            path: bx.shared_path().to_string(),
        })
        .collect();
    let table = Table::new(rows).to_string();
    println!("{table}");
    Ok(())
}

/// Write a helper container's output to stdout until it exits, then remove
/// the helper.
async fn drain(mut stream: OutputStream) -> Result<()> {
    let mut stdout = std::io::stdout();
    while let Some(chunk) = stream.next_chunk().await {
        stdout.write_all(&chunk?)?;
    }
    stdout.flush()?;
    stream.finish().await?;
    Ok(())
}
