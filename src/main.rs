//! carebell: elder-care assistant command line.
//!
//! Host-side front end for the assistant's core flows:
//! 1. Nearby hospitals, ranked by distance, with built-in data as last resort
//! 2. Place name for the current position
//! 3. Display and voice settings
//! 4. Taxi hand-off and voice command routing

mod config;

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{error, info, warn};

use amap_client::AmapClient;
use common::config::AppConfig;
use common::{
    place_label, Coordinate, Error, FixedGeolocator, Geolocator, Resolution, GENERIC_PLACE_LABEL,
};
use handoff::{match_department, Command, CommandInterpreter, DryRunLauncher, TaxiHandoff};
use nominatim_client::NominatimClient;
use preferences::{
    FamilyVoice, FontRole, FontSize, JsonFileStore, PreferenceStore, ReservationBook,
    SettingsContext,
};
use resolver::{BuiltinFacilities, FacilityResolver, NearbyView, ProviderChain};
use tencent_map_client::TencentMapClient;

/// Elder-care assistant
#[derive(Parser)]
#[command(name = "carebell", about = "Elder-care assistant: nearby hospitals, settings, taxi")]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(clap::Args, Clone, Copy)]
struct Position {
    /// Latitude of the current position. Without a fix the configured default location is used.
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    lat: Option<f64>,

    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    lon: Option<f64>,
}

impl Position {
    fn geolocator(self) -> FixedGeolocator {
        FixedGeolocator::new(self.lat.zip(self.lon).map(|(lat, lon)| Coordinate::new(lat, lon)))
    }
}

#[derive(Subcommand)]
enum Cmd {
    /// List the nearest hospitals.
    Nearby {
        #[command(flatten)]
        position: Position,

        /// Print the ranked list as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Show the place name for the current position.
    Where {
        #[command(flatten)]
        position: Position,
    },
    /// Remember that a hospital has been booked.
    Reserve { facility_id: String },
    /// Display and voice settings.
    Settings {
        #[command(subcommand)]
        action: SettingsCmd,
    },
    /// Hand a destination off to a taxi app.
    Taxi { destination: String },
    /// Interpret a spoken sentence and act on it.
    Say {
        text: String,
        #[command(flatten)]
        position: Position,
    },
}

#[derive(Subcommand)]
enum SettingsCmd {
    Show,
    Set {
        /// standard | large | extra-large
        #[arg(long)]
        font_size: Option<FontSize>,
        /// 0-100
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        volume: Option<u8>,
        /// Dialect label, e.g. 普通话 or cantonese
        #[arg(long)]
        dialect: Option<preferences::Dialect>,
        /// Toggle a family voice (grandson | daughter)
        #[arg(long)]
        voice: Vec<FamilyVoice>,
    },
    Reset,
}

/// Origin for a search: the device fix, or the configured default location.
async fn current_origin(geolocator: &dyn Geolocator, cfg: &AppConfig) -> Coordinate {
    match geolocator.current_coordinate().await {
        Ok(c) => c,
        Err(e) => {
            warn!(
                "{}; using default location {}",
                e, cfg.default_location.name
            );
            cfg.default_location.coordinate()
        }
    }
}

fn build_resolver(cfg: &AppConfig) -> Result<FacilityResolver, Error> {
    let mut chain = ProviderChain::new(BuiltinFacilities::default());

    if cfg.tencent_map_key.is_empty() {
        info!("TENCENT_MAP_KEY not set, skipping Tencent search");
    } else {
        let tencent = TencentMapClient::new(cfg.tencent_map_key.clone())?;
        chain = chain.with_provider(
            Arc::new(tencent),
            Duration::from_millis(cfg.providers.primary_timeout_ms),
        );
    }
    if cfg.providers.nominatim_enabled {
        let nominatim = NominatimClient::new(&cfg.providers.user_agent)?;
        chain = chain.with_provider(
            Arc::new(nominatim),
            Duration::from_millis(cfg.providers.secondary_timeout_ms),
        );
    }

    info!("Provider chain: {:?} -> builtin", chain.provider_names());
    let resolver = FacilityResolver::from_config(chain, &cfg.resolver);
    let settings = resolver.settings();
    info!(
        "Searching {:?} within {}m, top {}",
        settings.keyword, settings.radius_m, settings.top_k
    );
    Ok(resolver)
}

async fn describe_place(cfg: &AppConfig, origin: Coordinate) -> Result<String, Error> {
    if cfg.amap_key.is_empty() {
        return Ok(GENERIC_PLACE_LABEL.to_string());
    }
    let amap = AmapClient::new(
        cfg.amap_key.clone(),
        Duration::from_millis(cfg.providers.reverse_geocode_timeout_ms),
    )?;
    Ok(place_label(&amap, origin).await)
}

fn print_resolution(resolution: &Resolution, reservations: &ReservationBook) {
    let marker = if resolution.source.is_fallback() {
        " (built-in data)"
    } else {
        ""
    };
    println!("Nearby hospitals{marker}:");
    for ranked in resolution.facilities.iter() {
        let f = &ranked.facility;
        let booked = if reservations.is_reserved(&f.id) {
            " [reserved]"
        } else {
            ""
        };
        println!(
            "  {}. {} {} ({}){}",
            ranked.rank,
            f.name,
            ranked.distance_text(),
            f.address,
            booked
        );
        if let Some(phone) = &f.phone {
            println!("     tel {phone}");
        }
        println!("     id {}  quota {}", f.id, f.available_quota);
    }
}

async fn show_nearby(
    cfg: &AppConfig,
    store: Arc<dyn PreferenceStore>,
    origin: Coordinate,
    as_json: bool,
) -> Result<(), Error> {
    let resolver = build_resolver(cfg)?;
    let view = NearbyView::new();
    let place = describe_place(cfg, origin).await?;

    if let Some(resolution) = view.refresh(&resolver, origin).await? {
        if as_json {
            let body = json!({
                "place": place,
                "origin": origin,
                "source": &resolution.source,
                "computed_at": resolution.computed_at,
                "facilities": &*resolution.facilities,
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
        } else {
            println!("{place} {origin}");
            print_resolution(&resolution, &ReservationBook::load(store));
        }
    }
    view.dispose();
    Ok(())
}

fn show_settings(settings: &SettingsContext) {
    let s = settings.current();
    println!(
        "font size: {} ({}rpx; title {:.1}, button {:.1}, time {:.1})",
        s.font_size.label(),
        s.font_size.base_px(),
        s.font_px(FontRole::Title),
        s.font_px(FontRole::Button),
        s.font_px(FontRole::Time)
    );
    println!("volume:    {} ({})", s.volume, s.volume_level().label());
    println!("dialect:   {}", s.dialect);
    println!("voices:    {:?}", s.voices);
}

async fn hail(cfg: &AppConfig, destination: &str) -> Result<(), Error> {
    let launcher = Arc::new(DryRunLauncher::new(
        cfg.handoff.installed_apps.clone(),
        cfg.handoff.map_available,
    ));
    let outcome = TaxiHandoff::new(launcher).hail(destination).await?;
    println!("{}", outcome.message(destination.trim()));
    Ok(())
}

async fn run(cli: Cli, cfg: AppConfig) -> Result<(), Error> {
    let file_store = JsonFileStore::new(&cfg.preferences_path);
    info!("Preferences file: {}", file_store.path().display());
    let store: Arc<dyn PreferenceStore> = Arc::new(file_store);

    match cli.command {
        Cmd::Nearby { position, json } => {
            let origin = current_origin(&position.geolocator(), &cfg).await;
            show_nearby(&cfg, store, origin, json).await
        }
        Cmd::Where { position } => {
            let origin = current_origin(&position.geolocator(), &cfg).await;
            println!("{} {}", describe_place(&cfg, origin).await?, origin);
            Ok(())
        }
        Cmd::Reserve { facility_id } => {
            let mut book = ReservationBook::load(store);
            if book.reserve(&facility_id)? {
                println!("Reserved {facility_id}");
            } else {
                println!("{facility_id} was already reserved");
            }
            Ok(())
        }
        Cmd::Settings { action } => {
            let settings = SettingsContext::load(store);
            match action {
                SettingsCmd::Show => {}
                SettingsCmd::Set {
                    font_size,
                    volume,
                    dialect,
                    voice,
                } => {
                    settings.update(|s| {
                        if let Some(size) = font_size {
                            s.font_size = size;
                        }
                        if let Some(v) = volume {
                            s.volume = v;
                        }
                        if let Some(d) = dialect {
                            s.dialect = d;
                        }
                        for v in voice {
                            s.toggle_voice(v);
                        }
                    })?;
                }
                SettingsCmd::Reset => {
                    settings.reset_defaults()?;
                }
            }
            show_settings(&settings);
            Ok(())
        }
        Cmd::Taxi { destination } => hail(&cfg, &destination).await,
        Cmd::Say { text, position } => {
            let command = CommandInterpreter::new()?.interpret(&text);
            info!("Voice command {:?} from {:?}", command, text);
            match command {
                Command::Taxi {
                    destination: Some(destination),
                } => hail(&cfg, &destination).await,
                Command::Taxi { destination: None } => {
                    println!("请说出您要去的地方");
                    Ok(())
                }
                Command::Hospital => {
                    if let Some(dept) = match_department(&text) {
                        println!("建议科室：{}", dept.label());
                    }
                    let origin = current_origin(&position.geolocator(), &cfg).await;
                    show_nearby(&cfg, store, origin, false).await
                }
                Command::Payment => {
                    println!("生活缴费");
                    Ok(())
                }
                Command::Chat => {
                    println!("智能问答");
                    Ok(())
                }
                Command::Emergency => {
                    println!("紧急呼救");
                    Ok(())
                }
                Command::Settings => {
                    show_settings(&SettingsContext::load(store));
                    Ok(())
                }
                Command::Unknown => {
                    println!(
                        "暂时无法理解该指令，请尝试说：\n• \"我要打车\"\n• \"生活缴费\"\n• \"医院挂号\"\n• \"智能问答\"\n• \"紧急呼救\""
                    );
                    Ok(())
                }
            }
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "carebell=info,resolver=info,tencent_map_client=info,nominatim_client=info,\
                 amap_client=info,preferences=info,handoff=info"
                    .into()
            }),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();

    // Load configuration.
    let cfg = match config::load_config() {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(cli, cfg).await {
        error!("{}", e);
        std::process::exit(1);
    }
}
