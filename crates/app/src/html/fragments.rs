//! Popup markup: the hover name label and the detail dashboard with its
//! read-only radial gauges.

use std::f64::consts::FRAC_PI_2;
use std::fmt::Write as _;

use map_core::{DetailPopup, Gauge, PopupContent};

const GAUGE_WIDTH: f64 = 200.0;
const GAUGE_HEIGHT: f64 = 150.0;
/// Gauge arc start and end, clockwise from twelve o'clock.
const ANGLE_START: f64 = -FRAC_PI_2 - 0.35;
const ANGLE_END: f64 = FRAC_PI_2 + 0.35;
/// Track width as a fraction of the radius.
const TRACK_WIDTH: f64 = 0.25;
const TRACK_COLOR: &str = "grey";

pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

pub fn popup_html(content: &PopupContent) -> String {
    match content {
        PopupContent::Name(name) => format!("<span class=\"entity-name\">{}</span>", escape(name)),
        PopupContent::Detail(detail) => detail_html(detail),
    }
}

pub fn detail_html(detail: &DetailPopup) -> String {
    let link = escape(&detail.link);
    let mut html = format!(
        "<div class=\"dashboard\" data-entity=\"{}\" data-source=\"{}\">",
        escape(detail.entity.as_str()),
        escape(detail.source.as_str())
    );

    if detail.gauges.is_empty() {
        let _ = write!(
            html,
            "<p class=\"headline\"><a href=\"{link}\" target=\"_blank\" rel=\"noopener\">{}</a></p>",
            escape(&detail.headline)
        );
    } else {
        let _ = write!(html, "<p class=\"headline\">{}</p>", escape(&detail.headline));
        html.push_str("<div class=\"gauges\">");
        for gauge in &detail.gauges {
            html.push_str(&gauge_svg(gauge));
        }
        html.push_str("</div>");
        let _ = write!(
            html,
            "<p class=\"more\"><a href=\"{link}\" target=\"_blank\" rel=\"noopener\">Get involved</a></p>"
        );
    }

    html.push_str("</div>");
    html
}

pub fn gauge_svg(gauge: &Gauge) -> String {
    let cx = GAUGE_WIDTH / 2.0;
    let cy = GAUGE_HEIGHT / 2.0;
    let radius = 0.4 * GAUGE_WIDTH.min(GAUGE_HEIGHT);
    let stroke = (TRACK_WIDTH * radius).round();
    let color = gauge.color.css();

    let fraction = if gauge.max > 0.0 {
        (gauge.value / gauge.max).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let value_angle = ANGLE_START + fraction * (ANGLE_END - ANGLE_START);

    let mut svg = format!(
        "<svg class=\"gauge\" width=\"{GAUGE_WIDTH}\" height=\"{GAUGE_HEIGHT}\" \
viewBox=\"0 0 {GAUGE_WIDTH} {GAUGE_HEIGHT}\" role=\"img\" aria-label=\"{}\">",
        escape(&gauge.label)
    );
    let _ = write!(
        svg,
        "<path d=\"{}\" fill=\"none\" stroke=\"{TRACK_COLOR}\" stroke-width=\"{stroke}\"/>",
        arc_path(cx, cy, radius, ANGLE_START, ANGLE_END)
    );
    if fraction > 0.0 {
        let _ = write!(
            svg,
            "<path d=\"{}\" fill=\"none\" stroke=\"{color}\" stroke-width=\"{stroke}\"/>",
            arc_path(cx, cy, radius, ANGLE_START, value_angle)
        );
    }
    let _ = write!(
        svg,
        "<text x=\"{cx}\" y=\"{cy}\" text-anchor=\"middle\" dominant-baseline=\"middle\" \
fill=\"{color}\" font-size=\"24\">{}</text>",
        format_value(gauge.value)
    );
    let _ = write!(
        svg,
        "<text x=\"{cx}\" y=\"{}\" text-anchor=\"middle\" fill=\"{color}\" font-size=\"11\">{}</text>",
        GAUGE_HEIGHT - 4.0,
        escape(&gauge.label)
    );
    svg.push_str("</svg>");
    svg
}

/// SVG path of a clockwise arc between two angles measured from twelve o'clock.
pub fn arc_path(cx: f64, cy: f64, radius: f64, from: f64, to: f64) -> String {
    let (x0, y0) = polar(cx, cy, radius, from);
    let (x1, y1) = polar(cx, cy, radius, to);
    let large_arc = u8::from(to - from > std::f64::consts::PI);
    format!("M {x0:.2} {y0:.2} A {radius:.2} {radius:.2} 0 {large_arc} 1 {x1:.2} {y1:.2}")
}

fn polar(cx: f64, cy: f64, radius: f64, angle: f64) -> (f64, f64) {
    (cx + radius * angle.sin(), cy - radius * angle.cos())
}

fn format_value(value: f64) -> String {
    let rounded = format!("{value:.1}");
    match rounded.strip_suffix(".0") {
        Some(whole) => whole.to_string(),
        None => rounded,
    }
}
