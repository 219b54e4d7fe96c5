use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use storefront_catalog::catalog::Catalog;
use storefront_catalog::models::{ImageFile, Product};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "storefront-catalog")]
#[command(about = "Manage storefront catalog products")]
struct CliArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print every stored product as JSON.
    List,
    /// Save one product, optionally uploading an image for it first.
    Add(AddArgs),
}

#[derive(Debug, clap::Args)]
struct AddArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    price: f64,
    /// Size label; repeat for several.
    #[arg(long = "size")]
    sizes: Vec<String>,
    /// In-stock size label; repeat for several.
    #[arg(long = "available-size")]
    available_sizes: Vec<String>,
    /// Category tag; repeat for several.
    #[arg(long = "category")]
    category: Vec<String>,
    /// Image file to upload before saving.
    #[arg(long, value_name = "PATH")]
    image: Option<PathBuf>,
}

impl AddArgs {
    fn product(&self) -> Product {
        Product::new(self.name.clone(), self.price)
            .with_sizes(self.sizes.iter().cloned())
            .with_available_sizes(self.available_sizes.iter().cloned())
            .with_category(self.category.iter().cloned())
    }
}

async fn run(catalog: &Catalog, command: Command) -> Result<()> {
    match command {
        Command::List => {
            let products = catalog.get_products().await?;
            println!("{}", serde_json::to_string_pretty(&products)?);
        }
        Command::Add(args) => {
            let file = match &args.image {
                Some(path) => Some(
                    ImageFile::from_path(path)
                        .await
                        .with_context(|| format!("Failed to read {}", path.display()))?,
                ),
                None => None,
            };
            let id = catalog
                .save_product_with_image(args.product(), file.as_ref())
                .await?;
            println!("{}", id);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storefront_catalog=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = CliArgs::parse();

    let catalog = match Catalog::new() {
        Ok(catalog) => catalog,
        Err(e) => {
            error!("Failed to initialize catalog: {}", e);
            std::process::exit(1);
        }
    };

    match run(&catalog, args.command).await {
        Ok(()) => {
            info!("Done");
            Ok(())
        }
        Err(e) => {
            error!("Command failed: {:#}", e);
            std::process::exit(1);
        }
    }
}
