use crate::ir_map::{Properties, PropertyValue};

/// `layer` property: which side of the characters a layer draws on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerHint {
    Upper,
    Lower,
}

/// The custom properties a renderer and its consumers care about, read
/// once from the layer's property map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LayerProperties {
    pub parallax: bool,
    pub collision: bool,
    /// Region id painted by this layer; 0 means none.
    pub region_id: Option<i64>,
    pub layer_hint: Option<LayerHint>,
    /// Scroll speed per frame in pixels, present when `planeX` or `planeY`
    /// is set. Unreadable components count as 0.
    pub plane_speed: Option<(i32, i32)>,
}

impl LayerProperties {
    pub fn from_properties(props: &Properties) -> Self {
        let region_id = props
            .get("regionId")
            .and_then(|v| v.to_int_lossy())
            .filter(|id| *id != 0);

        let layer_hint = props.get("layer").map(|v| match v {
            PropertyValue::String(s) if s == "upper" => LayerHint::Upper,
            _ => LayerHint::Lower,
        });

        let speed = |name: &str| {
            props
                .get(name)
                .and_then(|v| v.to_int_lossy())
                .and_then(|n| i32::try_from(n).ok())
                .unwrap_or(0)
        };
        let plane_speed = (props.contains("planeX") || props.contains("planeY"))
            .then(|| (speed("planeX"), speed("planeY")));

        Self {
            parallax: props.flag("parallax"),
            collision: props.flag("collision"),
            region_id,
            layer_hint,
            plane_speed,
        }
    }

    /// Per-frame scroll, (0, 0) when the layer does not scroll.
    pub fn scroll_speed(&self) -> (i32, i32) {
        self.plane_speed.unwrap_or((0, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn props(entries: &[(&str, PropertyValue)]) -> Properties {
        let mut p = Properties::new();
        for (name, value) in entries {
            p.insert(*name, value.clone());
        }
        p
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        assert_eq!(
            LayerProperties::from_properties(&Properties::new()),
            LayerProperties::default()
        );
    }

    #[test]
    fn reads_every_flag() {
        let parsed = LayerProperties::from_properties(&props(&[
            ("parallax", PropertyValue::Bool(true)),
            ("collision", PropertyValue::String("full".into())),
            ("regionId", PropertyValue::String("7".into())),
            ("layer", PropertyValue::String("upper".into())),
            ("planeX", PropertyValue::I64(2)),
            ("planeY", PropertyValue::String("nope".into())),
        ]));

        assert_eq!(
            parsed,
            LayerProperties {
                parallax: true,
                collision: true,
                region_id: Some(7),
                layer_hint: Some(LayerHint::Upper),
                plane_speed: Some((2, 0)),
            }
        );
    }

    #[test]
    fn non_upper_layer_values_mean_lower() {
        let parsed = LayerProperties::from_properties(&props(&[
            ("layer", PropertyValue::String("ground".into())),
            ("regionId", PropertyValue::I64(0)),
        ]));
        assert_eq!(parsed.layer_hint, Some(LayerHint::Lower));
        assert_eq!(parsed.region_id, None);
        assert_eq!(parsed.scroll_speed(), (0, 0));
    }
}
