use cellway_core::GeoPoint;
use cellway_engine::{
    CellwayConfig, DefaultRouteOptimizer, OptimizationType, OptimizedRoute, RouteVariants,
};
use clap::{Args, ValueEnum};
use comfy_table::{Table, presets::UTF8_FULL};
use tracing::info;

use crate::parsers;

#[derive(Clone, Copy, ValueEnum)]
pub enum Variant {
    Fastest,
    CellCoverage,
    Balanced,
}

impl From<Variant> for OptimizationType {
    fn from(variant: Variant) -> Self {
        match variant {
            Variant::Fastest => OptimizationType::Fastest,
            Variant::CellCoverage => OptimizationType::CellCoverage,
            Variant::Balanced => OptimizationType::Balanced,
        }
    }
}

#[derive(Args)]
pub struct RouteArgs {
    /// Start point as "lat,lng"
    #[arg(long, value_parser = parsers::parse_point, allow_hyphen_values = true)]
    from: GeoPoint,

    /// End point as "lat,lng"
    #[arg(long, value_parser = parsers::parse_point, allow_hyphen_values = true)]
    to: GeoPoint,

    #[arg(short, long, value_enum, default_value_t = Variant::Balanced)]
    variant: Variant,

    /// Print the full route as JSON instead of a summary
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
pub struct CompareArgs {
    /// Start point as "lat,lng"
    #[arg(long, value_parser = parsers::parse_point, allow_hyphen_values = true)]
    from: GeoPoint,

    /// End point as "lat,lng"
    #[arg(long, value_parser = parsers::parse_point, allow_hyphen_values = true)]
    to: GeoPoint,

    #[arg(long)]
    json: bool,
}

pub async fn run_route(args: RouteArgs, config: CellwayConfig) -> Result<(), anyhow::Error> {
    let optimizer = DefaultRouteOptimizer::from_config(config);
    let route = optimizer
        .get_route(args.from, args.to, args.variant.into())
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&route)?);
    } else {
        println!("{}", summary_table(&[&route]));
    }

    Ok(())
}

pub async fn run_compare(args: CompareArgs, config: CellwayConfig) -> Result<(), anyhow::Error> {
    let optimizer = DefaultRouteOptimizer::from_config(config);
    let variants = optimizer.compare(args.from, args.to).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&variants)?);
        return Ok(());
    }

    info!(
        "{} candidates, towers from {}",
        variants.candidate_count, variants.tower_source
    );

    let routes = variant_routes(variants)?;
    println!("{}", summary_table(&routes.iter().collect::<Vec<_>>()));

    Ok(())
}

fn variant_routes(variants: RouteVariants) -> Result<Vec<OptimizedRoute>, anyhow::Error> {
    OptimizationType::ALL
        .into_iter()
        .map(|optimization| {
            variants
                .clone()
                .into_route(optimization)
                .map_err(anyhow::Error::from)
        })
        .collect()
}

fn summary_table(routes: &[&OptimizedRoute]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Variant",
        "Candidate",
        "Provider",
        "Distance (km)",
        "Duration (min)",
        "Avg signal (dBm)",
        "Min signal (dBm)",
        "Low signal",
        "Towers",
        "Balanced score",
    ]);

    for route in routes {
        let metadata = &route.metadata;
        table.add_row(vec![
            metadata.optimization_type.to_string(),
            metadata.selected_index.to_string(),
            route.route.provider.to_string(),
            format!("{:.1}", route.route.distance / 1000.0),
            format!("{:.1}", route.route.duration / 60.0),
            format!("{:.1}", metadata.signal.average_signal),
            format!("{:.1}", metadata.signal.min_signal),
            format!("{:.0}%", metadata.signal.low_signal_fraction * 100.0),
            metadata.tower_count.to_string(),
            format!("{:.3}", metadata.balanced_score),
        ]);
    }

    table
}
