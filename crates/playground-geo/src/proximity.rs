//! Ranking by squared distance in raw degree space.
//!
//! No projection or great-circle maths: at city scale the ordering is what
//! matters, not the distance itself.

use playground_types::models::Playground;

use crate::Coordinates;

/// Anything with a position.
pub trait Located {
    fn coordinates(&self) -> Coordinates;
}

impl Located for Playground {
    fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.long, self.lat)
    }
}

impl Located for Coordinates {
    fn coordinates(&self) -> Coordinates {
        *self
    }
}

pub fn squared_distance(a: Coordinates, b: Coordinates) -> f64 {
    let dx = a.longitude - b.longitude;
    let dy = a.latitude - b.latitude;
    dx * dx + dy * dy
}

/// Orders `items` closest first. Equal distances keep their input order.
pub fn rank<T: Located>(items: Vec<T>, reference: Coordinates) -> Vec<T> {
    let mut keyed: Vec<(f64, T)> = items
        .into_iter()
        .map(|item| (squared_distance(item.coordinates(), reference), item))
        .collect();
    // sort_by is stable
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
    keyed.into_iter().map(|(_, item)| item).collect()
}

/// The `limit` closest items.
pub fn nearest<T: Located>(items: Vec<T>, reference: Coordinates, limit: usize) -> Vec<T> {
    let mut ranked = rank(items, reference);
    ranked.truncate(limit);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str, long: f64, lat: f64) -> Playground {
        serde_json::from_value(serde_json::json!({
            "name": name, "long": long, "lat": lat
        }))
        .unwrap()
    }

    #[test]
    fn paris_fixture_order() {
        let reference = Coordinates::new(2.372452, 48.886835);
        let ranked = rank(
            vec![
                named("C", 2.31565, 48.8533),
                named("A", 2.36016, 48.8532),
                named("B", 2.31718, 48.87867),
            ],
            reference,
        );
        let names: Vec<_> = ranked.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn ties_keep_input_order() {
        let reference = Coordinates::new(0.0, 0.0);
        let ranked = rank(
            vec![
                named("east", 1.0, 0.0),
                named("far", 5.0, 5.0),
                named("north", 0.0, 1.0),
                named("west", -1.0, 0.0),
            ],
            reference,
        );
        let names: Vec<_> = ranked.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["east", "north", "west", "far"]);
    }

    #[test]
    fn nearest_truncates() {
        let points: Vec<Coordinates> = (0..15).map(|i| Coordinates::new(i as f64, 0.0)).collect();
        let top = nearest(points, Coordinates::new(0.0, 0.0), 10);
        assert_eq!(top.len(), 10);
        assert_eq!(top[9].longitude, 9.0);
    }

    #[test]
    fn empty_in_empty_out() {
        assert!(rank(Vec::<Coordinates>::new(), Coordinates::new(1.0, 1.0)).is_empty());
    }

    #[test]
    fn squared_not_euclidean() {
        let d = squared_distance(Coordinates::new(3.0, 4.0), Coordinates::new(0.0, 0.0));
        assert_eq!(d, 25.0);
    }
}
