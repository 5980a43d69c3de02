use fxhash::FxHashMap;

const KMH_PER_MPH: f64 = 1.609_344;

/// Highway classes a car may drive on.
pub static DRIVABLE_HIGHWAYS: [&str; 16] = [
    "motorway",
    "motorway_link",
    "trunk",
    "trunk_link",
    "primary",
    "primary_link",
    "secondary",
    "secondary_link",
    "tertiary",
    "tertiary_link",
    "unclassified",
    "residential",
    "living_street",
    "service",
    "road",
    "track",
];

static ONEWAY_FORWARD: [&str; 3] = ["yes", "true", "1"];

pub type Tags = FxHashMap<String, String>;

pub fn is_drivable(tags: &Tags) -> bool {
    match tags.get("highway").map(String::as_str) {
        Some("service") if tags.get("service").is_some_and(|s| s == "emergency_access") => false,
        Some(highway) => DRIVABLE_HIGHWAYS.contains(&highway),
        None => false,
    }
}

// https://wiki.openstreetmap.org/wiki/Key:maxspeed
pub fn parse_max_speed(tags: &Tags) -> Option<f64> {
    let value = tags.get("maxspeed")?.trim();
    match value {
        "walk" => Some(5.0),
        "none" => Some(150.0),
        _ => {
            let (number, factor) = match value.strip_suffix("mph") {
                Some(number) => (number.trim(), KMH_PER_MPH),
                None => (value.strip_suffix("km/h").unwrap_or(value).trim(), 1.0),
            };
            number
                .parse::<f64>()
                .ok()
                .filter(|speed| *speed > 0.0)
                .map(|speed| speed * factor)
        }
    }
}

pub fn default_speed_for_highway(highway: &str) -> f64 {
    match highway {
        "motorway" => 120.0,
        "motorway_link" => 70.0,

        "trunk" => 70.0,
        "trunk_link" => 70.0,

        "primary" => 60.0,
        "primary_link" => 60.0,

        "secondary" => 50.0,
        "secondary_link" => 40.0,

        "tertiary" => 30.0,
        "tertiary_link" => 30.0,

        "unclassified" => 30.0,
        "residential" => 30.0,
        "living_street" => 5.0,
        "service" => 20.0,

        "road" => 20.0,
        "track" => 15.0,

        _ => 30.0,
    }
}

pub fn average_speed(tags: &Tags) -> f64 {
    parse_max_speed(tags).unwrap_or_else(|| {
        default_speed_for_highway(tags.get("highway").map(String::as_str).unwrap_or(""))
    })
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Oneway {
    No,
    Forward,
    Backward,
}

// https://wiki.openstreetmap.org/wiki/Key:oneway
pub fn oneway(tags: &Tags) -> Oneway {
    match tags.get("oneway").map(String::as_str) {
        Some("-1") => Oneway::Backward,
        Some(value) if ONEWAY_FORWARD.contains(&value) => Oneway::Forward,
        Some("no") => Oneway::No,
        _ => {
            let implied = matches!(
                tags.get("highway").map(String::as_str),
                Some("motorway" | "motorway_link")
            ) || matches!(
                tags.get("junction").map(String::as_str),
                Some("roundabout" | "circular")
            );

            if implied { Oneway::Forward } else { Oneway::No }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_max_speed() {
        assert_eq!(parse_max_speed(&tags(&[("maxspeed", "walk")])), Some(5.0));
        assert_eq!(parse_max_speed(&tags(&[("maxspeed", "none")])), Some(150.0));
        assert_eq!(parse_max_speed(&tags(&[("maxspeed", "50")])), Some(50.0));
        assert_eq!(parse_max_speed(&tags(&[("maxspeed", "80 km/h")])), Some(80.0));
        let mph = parse_max_speed(&tags(&[("maxspeed", "30 mph")])).unwrap();
        assert!((mph - 48.28).abs() < 0.01);
        assert_eq!(parse_max_speed(&tags(&[("maxspeed", "signals")])), None);
        assert_eq!(parse_max_speed(&tags(&[])), None);
    }

    #[test]
    fn test_average_speed_defaults() {
        assert_eq!(average_speed(&tags(&[("highway", "motorway")])), 120.0);
        assert_eq!(
            average_speed(&tags(&[("highway", "residential"), ("maxspeed", "40")])),
            40.0
        );
        assert_eq!(average_speed(&tags(&[("highway", "unknown")])), 30.0);
    }

    #[test]
    fn test_oneway() {
        assert_eq!(oneway(&tags(&[("highway", "primary")])), Oneway::No);
        assert_eq!(oneway(&tags(&[("oneway", "yes")])), Oneway::Forward);
        assert_eq!(oneway(&tags(&[("oneway", "1")])), Oneway::Forward);
        assert_eq!(oneway(&tags(&[("oneway", "-1")])), Oneway::Backward);
        assert_eq!(oneway(&tags(&[("highway", "motorway")])), Oneway::Forward);
        assert_eq!(
            oneway(&tags(&[("highway", "motorway"), ("oneway", "no")])),
            Oneway::No
        );
        assert_eq!(
            oneway(&tags(&[("highway", "primary"), ("junction", "roundabout")])),
            Oneway::Forward
        );
    }

    #[test]
    fn test_is_drivable() {
        assert!(is_drivable(&tags(&[("highway", "residential")])));
        assert!(!is_drivable(&tags(&[("highway", "footway")])));
        assert!(!is_drivable(&tags(&[("highway", "service"), ("service", "emergency_access")])));
        assert!(!is_drivable(&tags(&[("building", "yes")])));
    }
}
