use cellway_core::BoundingBox;
use cellway_engine::{CellwayConfig, DefaultRouteOptimizer};
use clap::Args;
use comfy_table::{Table, presets::UTF8_FULL};

use crate::parsers;

#[derive(Args)]
pub struct TowersArgs {
    /// Area as "min_lat,min_lng,max_lat,max_lng"
    #[arg(long, value_parser = parsers::parse_bbox, allow_hyphen_values = true)]
    bbox: BoundingBox,

    #[arg(long)]
    json: bool,

    /// Rows printed in table mode
    #[arg(long, default_value_t = 20)]
    limit: usize,
}

pub async fn run(args: TowersArgs, config: CellwayConfig) -> Result<(), anyhow::Error> {
    let optimizer = DefaultRouteOptimizer::from_config(config);
    let query = optimizer.get_towers(&args.bbox).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&query)?);
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Id", "Radio", "Lat", "Lng", "Signal (dBm)", "Range (m)"]);

    for tower in query.towers.iter().take(args.limit) {
        table.add_row(vec![
            tower.id.clone().unwrap_or_default(),
            tower.radio.to_string(),
            format!("{:.5}", tower.position.lat),
            format!("{:.5}", tower.position.lng),
            format!("{:.1}", tower.average_signal),
            format!("{:.0}", tower.range),
        ]);
    }

    println!("{table}");
    println!(
        "{} of {} towers in area, source: {}",
        query.towers.len(),
        query.total_in_area,
        query.source
    );

    Ok(())
}
