//! `foundry` -- load an unpacked game tree and print what the catalog holds.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;
use foundry_data::station_modules::StationModule;
use foundry_data::{FsVfs, GameData, LoaderConfig, Ware};
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "foundry")]
#[command(about = "Load X4-style game data and inspect the catalog")]
struct Args {
    /// Unpacked game directory
    #[arg(value_name = "GAME_DIR")]
    game_dir: PathBuf,

    /// Loader settings (toml, ron or json)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Text language id, overriding the settings file
    #[arg(short, long, value_name = "ID")]
    language: Option<u32>,

    /// Print one station module
    #[arg(short, long, value_name = "MACRO")]
    module: Option<String>,

    /// Print one ware
    #[arg(short, long, value_name = "ID")]
    ware: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    setup_tracing();

    let mut config = match &args.config {
        Some(path) => LoaderConfig::from_file(path)
            .with_context(|| format!("reading settings {}", path.display()))?,
        None => LoaderConfig::default(),
    };
    if let Some(language) = args.language {
        config.language = language;
    }
    debug!(?config, "loader settings");

    let vfs = FsVfs::new(&args.game_dir)
        .with_context(|| format!("opening game directory {}", args.game_dir.display()))?;
    info!(root = %vfs.root().display(), "loading game data");
    let data = GameData::load(Arc::new(vfs), &config, &|status| debug!("{status}"))?;

    if let Some(id) = &args.module {
        let Some(module) = data.module(id) else {
            bail!("no station module '{id}'");
        };
        print_module(&data, module);
    } else if let Some(id) = &args.ware {
        print_ware(&data, &data.ware(id));
    } else {
        print_summary(&data);
    }
    Ok(())
}

fn setup_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_summary(data: &GameData) {
    println!("text pages:      {}", data.texts().page_count());
    println!("races:           {}", data.races().count());
    println!("wares:           {}", data.wares().len());
    println!("ware groups:     {}", data.wares().ware_groups().len());
    println!("station modules: {}", data.module_count());
}

fn print_module(data: &GameData, module: &StationModule) {
    println!("{} ({})", data.texts().text(module.name), module.macro_id);
    println!("  component:  {}", module.component);
    println!("  class:      {:?}", module.class);
    println!("  hull:       {}", module.hull);
    println!("  explosion:  {}", module.explosion_damage);
    println!("  buildable:  {}", module.player_buildable);
    if module.race_limited {
        let races: Vec<&str> = module.races.iter().map(String::as_str).collect();
        println!("  races:      {}", races.join(", "));
    }
    for property in module.properties.values() {
        println!("  {property:?}");
    }
}

fn print_ware(data: &GameData, ware: &Ware) {
    println!("{} ({})", data.texts().text(ware.name), ware.id);
    println!("  group:      {}", ware.group);
    println!("  transport:  {:?}", ware.transport);
    println!("  volume:     {}", ware.volume);
    println!(
        "  price:      {} / {} / {}",
        ware.min_price, ware.average_price, ware.max_price
    );
    for (method, production) in &ware.productions {
        println!(
            "  production {method}: {} every {}s, work {}",
            production.amount, production.time, production.work_effect
        );
        for resource in production.resources.values() {
            println!("    {} x{}", resource.ware, resource.amount);
        }
    }
}
