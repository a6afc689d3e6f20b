//! Network-aware payload optimization.
//!
//! Connection quality is sampled at call time through a [`ConnectionMonitor`]
//! and never persisted. When the monitor has no information the optimizer
//! fails open: the network is assumed not slow and images stay high quality.
//!
//! Payloads are opaque JSON; transforms return shallow copies and never
//! mutate their input.

use std::sync::Arc;

use serde_json::{Map, Value};

/// Coarse effective connection type, as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectiveType {
    Slow2g,
    Cell2g,
    Cell3g,
    Cell4g,
    Unknown,
}

/// Read-only connection snapshot sampled at call time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionQuality {
    pub effective_type: EffectiveType,
    pub save_data: bool,
}

/// Source of connection snapshots. `None` means the platform exposes no
/// connection information.
pub trait ConnectionMonitor: Send + Sync + std::fmt::Debug {
    fn sample(&self) -> Option<ConnectionQuality>;
}

/// Monitor returning a fixed snapshot; doubles as "no information" when
/// constructed with [`FixedMonitor::unavailable`].
#[derive(Debug, Clone)]
pub struct FixedMonitor {
    quality: Option<ConnectionQuality>,
}

impl FixedMonitor {
    pub fn new(effective_type: EffectiveType, save_data: bool) -> Self {
        Self { quality: Some(ConnectionQuality { effective_type, save_data }) }
    }

    pub fn unavailable() -> Self {
        Self { quality: None }
    }
}

impl ConnectionMonitor for FixedMonitor {
    fn sample(&self) -> Option<ConnectionQuality> {
        self.quality
    }
}

/// Target image quality for the current connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageQuality {
    Low,
    Medium,
    High,
}

/// Decides payload reductions from sampled connection quality.
#[derive(Debug, Clone)]
pub struct NetworkOptimizer {
    monitor: Arc<dyn ConnectionMonitor>,
}

impl NetworkOptimizer {
    pub fn new(monitor: Arc<dyn ConnectionMonitor>) -> Self {
        Self { monitor }
    }

    /// True on 2g/slow-2g or when save-data mode is on. Unknown or missing
    /// connection information counts as not slow.
    pub fn is_slow_network(&self) -> bool {
        match self.monitor.sample() {
            Some(quality) => {
                quality.save_data
                    || matches!(
                        quality.effective_type,
                        EffectiveType::Slow2g | EffectiveType::Cell2g
                    )
            }
            None => false,
        }
    }

    pub fn optimal_image_quality(&self) -> ImageQuality {
        match self.monitor.sample().map(|q| q.effective_type) {
            Some(EffectiveType::Slow2g) | Some(EffectiveType::Cell2g) => ImageQuality::Low,
            Some(EffectiveType::Cell3g) => ImageQuality::Medium,
            _ => ImageQuality::High,
        }
    }
}

impl Default for NetworkOptimizer {
    fn default() -> Self {
        Self::new(Arc::new(FixedMonitor::unavailable()))
    }
}

/// Keep only the allow-listed fields of an object payload. With no allow-list
/// the payload is returned unchanged (cloned). Missing keys are simply
/// absent from the result.
pub fn compress_request_payload(payload: &Value, allowed_fields: Option<&[&str]>) -> Value {
    let Some(allowed) = allowed_fields else {
        return payload.clone();
    };
    match payload.as_object() {
        Some(object) => {
            let mut compressed = Map::new();
            for field in allowed {
                if let Some(value) = object.get(*field) {
                    compressed.insert((*field).to_string(), value.clone());
                }
            }
            Value::Object(compressed)
        }
        None => payload.clone(),
    }
}

/// Reductions applied by [`reduce_response_payload`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ReduceOptions {
    pub remove_images: bool,
    pub remove_descriptions: bool,
    /// Truncate every array-valued field to at most this many elements.
    pub limit_arrays: Option<usize>,
}

const IMAGE_FIELDS: &[&str] = &["image", "images", "imageUrl", "thumbnail", "photos"];
const DESCRIPTION_FIELDS: &[&str] = &["description", "longDescription", "summary"];

/// Shallow, non-mutating reduction of a response payload. `None` passes
/// through as `None`; non-object payloads are cloned unchanged.
pub fn reduce_response_payload(payload: Option<&Value>, options: &ReduceOptions) -> Option<Value> {
    let payload = payload?;
    let Some(object) = payload.as_object() else {
        return Some(payload.clone());
    };

    let mut reduced = Map::new();
    for (key, value) in object {
        if options.remove_images && IMAGE_FIELDS.contains(&key.as_str()) {
            continue;
        }
        if options.remove_descriptions && DESCRIPTION_FIELDS.contains(&key.as_str()) {
            continue;
        }
        let value = match (options.limit_arrays, value.as_array()) {
            (Some(limit), Some(items)) => {
                Value::Array(items.iter().take(limit).cloned().collect())
            }
            _ => value.clone(),
        };
        reduced.insert(key.clone(), value);
    }
    Some(Value::Object(reduced))
}

// Fixed mobile reduction profile.
const MOBILE_MAX_IMAGES: usize = 2;
const MOBILE_MAX_AMENITIES: usize = 5;
const MOBILE_MAX_TAGS: usize = 4;
const MOBILE_MAX_ALTERNATIVE_DATES: usize = 3;

fn cap_array_field(object: &mut Map<String, Value>, field: &str, limit: usize) {
    if let Some(Value::Array(items)) = object.get_mut(field) {
        items.truncate(limit);
    }
}

/// Mobile profile for availability responses: alternative dates capped at 3
/// and each room slimmed like [`optimize_hotel_data`]. Identity when the
/// mobile flag is off.
pub fn optimize_availability_response(payload: &Value, mobile: bool) -> Value {
    if !mobile {
        return payload.clone();
    }
    let Some(object) = payload.as_object() else {
        return payload.clone();
    };
    let mut optimized = object.clone();
    cap_array_field(&mut optimized, "alternativeDates", MOBILE_MAX_ALTERNATIVE_DATES);
    if let Some(Value::Array(rooms)) = optimized.get_mut("rooms") {
        for room in rooms.iter_mut() {
            *room = optimize_hotel_data(room, true);
        }
    }
    Value::Object(optimized)
}

/// Mobile profile for hotel/room payloads: images capped at 2, amenities at
/// 5, tags at 4. Identity when the mobile flag is off.
pub fn optimize_hotel_data(payload: &Value, mobile: bool) -> Value {
    if !mobile {
        return payload.clone();
    }
    let Some(object) = payload.as_object() else {
        return payload.clone();
    };
    let mut optimized = object.clone();
    cap_array_field(&mut optimized, "images", MOBILE_MAX_IMAGES);
    cap_array_field(&mut optimized, "amenities", MOBILE_MAX_AMENITIES);
    cap_array_field(&mut optimized, "tags", MOBILE_MAX_TAGS);
    Value::Object(optimized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn optimizer(effective_type: EffectiveType, save_data: bool) -> NetworkOptimizer {
        NetworkOptimizer::new(Arc::new(FixedMonitor::new(effective_type, save_data)))
    }

    #[test]
    fn slow_network_detection() {
        assert!(optimizer(EffectiveType::Slow2g, false).is_slow_network());
        assert!(optimizer(EffectiveType::Cell2g, false).is_slow_network());
        assert!(optimizer(EffectiveType::Cell4g, true).is_slow_network(), "save-data counts");
        assert!(!optimizer(EffectiveType::Cell3g, false).is_slow_network());
        assert!(!optimizer(EffectiveType::Cell4g, false).is_slow_network());
    }

    #[test]
    fn missing_connection_info_fails_open() {
        let optimizer = NetworkOptimizer::new(Arc::new(FixedMonitor::unavailable()));
        assert!(!optimizer.is_slow_network());
        assert_eq!(optimizer.optimal_image_quality(), ImageQuality::High);
    }

    #[test]
    fn image_quality_follows_connection_tier() {
        assert_eq!(optimizer(EffectiveType::Slow2g, false).optimal_image_quality(), ImageQuality::Low);
        assert_eq!(optimizer(EffectiveType::Cell2g, false).optimal_image_quality(), ImageQuality::Low);
        assert_eq!(optimizer(EffectiveType::Cell3g, false).optimal_image_quality(), ImageQuality::Medium);
        assert_eq!(optimizer(EffectiveType::Cell4g, false).optimal_image_quality(), ImageQuality::High);
        assert_eq!(optimizer(EffectiveType::Unknown, false).optimal_image_quality(), ImageQuality::High);
    }

    #[test]
    fn compress_projects_onto_the_allow_list() {
        let payload = json!({"city": "rome", "guests": 2, "internalFlag": true});
        let compressed = compress_request_payload(&payload, Some(&["city", "guests", "absent"]));
        assert_eq!(compressed, json!({"city": "rome", "guests": 2}));

        // Input untouched.
        assert_eq!(payload["internalFlag"], true);
    }

    #[test]
    fn compress_without_allow_list_is_identity() {
        let payload = json!({"a": 1, "b": [1, 2, 3]});
        assert_eq!(compress_request_payload(&payload, None), payload);
    }

    #[test]
    fn reduce_limits_every_array_field() {
        let payload = json!({"items": [1, 2, 3, 4, 5]});
        let reduced = reduce_response_payload(
            Some(&payload),
            &ReduceOptions { limit_arrays: Some(2), ..Default::default() },
        );
        assert_eq!(reduced, Some(json!({"items": [1, 2]})));
    }

    #[test]
    fn reduce_none_passes_through() {
        assert_eq!(reduce_response_payload(None, &ReduceOptions::default()), None);
    }

    #[test]
    fn reduce_strips_image_and_description_fields() {
        let payload = json!({
            "name": "Hotel Roma",
            "image": "a.jpg",
            "images": ["a.jpg", "b.jpg"],
            "description": "lovely",
            "price": 120,
        });
        let reduced = reduce_response_payload(
            Some(&payload),
            &ReduceOptions { remove_images: true, remove_descriptions: true, limit_arrays: None },
        )
        .unwrap();
        assert_eq!(reduced, json!({"name": "Hotel Roma", "price": 120}));
    }

    #[test]
    fn reduce_non_object_is_cloned() {
        let payload = json!([1, 2, 3]);
        let reduced = reduce_response_payload(Some(&payload), &ReduceOptions::default());
        assert_eq!(reduced, Some(payload));
    }

    #[test]
    fn hotel_mobile_profile_caps_lists() {
        let payload = json!({
            "name": "Grand",
            "images": ["1", "2", "3", "4"],
            "amenities": ["a", "b", "c", "d", "e", "f", "g"],
            "tags": ["t1", "t2", "t3", "t4", "t5"],
        });
        let optimized = optimize_hotel_data(&payload, true);
        assert_eq!(optimized["images"].as_array().unwrap().len(), 2);
        assert_eq!(optimized["amenities"].as_array().unwrap().len(), 5);
        assert_eq!(optimized["tags"].as_array().unwrap().len(), 4);
        assert_eq!(optimized["name"], "Grand");

        assert_eq!(optimize_hotel_data(&payload, false), payload, "identity off mobile");
    }

    #[test]
    fn availability_mobile_profile_caps_dates_and_rooms() {
        let payload = json!({
            "available": true,
            "alternativeDates": ["d1", "d2", "d3", "d4", "d5"],
            "rooms": [
                {"name": "Suite", "images": ["1", "2", "3"], "amenities": ["a", "b", "c", "d", "e", "f"]},
            ],
        });
        let optimized = optimize_availability_response(&payload, true);
        assert_eq!(optimized["alternativeDates"].as_array().unwrap().len(), 3);
        assert_eq!(optimized["rooms"][0]["images"].as_array().unwrap().len(), 2);
        assert_eq!(optimized["rooms"][0]["amenities"].as_array().unwrap().len(), 5);

        assert_eq!(optimize_availability_response(&payload, false), payload);
    }
}
