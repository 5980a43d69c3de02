use cellway_core::{BoundingBox, GeoPoint};

/// Parses `lat,lng`.
pub fn parse_point(input: &str) -> Result<GeoPoint, String> {
    let values = parse_numbers(input, 2)?;
    GeoPoint::try_new(values[0], values[1]).map_err(|err| err.to_string())
}

/// Parses `min_lat,min_lng,max_lat,max_lng`.
pub fn parse_bbox(input: &str) -> Result<BoundingBox, String> {
    let values = parse_numbers(input, 4)?;
    for (lat, lng) in [(values[0], values[1]), (values[2], values[3])] {
        GeoPoint::try_new(lat, lng).map_err(|err| err.to_string())?;
    }

    if values[0] > values[2] || values[1] > values[3] {
        return Err(String::from("Minimum corner must be south-west of maximum corner"));
    }

    Ok(BoundingBox::new(values[0], values[1], values[2], values[3]))
}

fn parse_numbers(input: &str, expected: usize) -> Result<Vec<f64>, String> {
    let values = input
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<f64>, _>>()
        .map_err(|err| format!("Invalid number in {input:?}: {err}"))?;

    if values.len() != expected {
        return Err(format!(
            "Expected {expected} comma separated values, got {}",
            values.len()
        ));
    }

    Ok(values)
}
