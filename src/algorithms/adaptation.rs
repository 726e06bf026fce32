use crate::config::AdaptationConfig;
use crate::models::{
    AdaptationNote, AdaptationSettings, ConnectionQuality, ContextSignals, DescriptionLength,
    DeviceKind, Layout,
};

/// Apply the context rules to the baseline settings.
///
/// The three rules are independent and every applicable one fires, in
/// declaration order: bandwidth, time, mobile. Each appends a note so the
/// visitor can see why the page changed shape.
pub fn compute_adaptation(
    signals: &ContextSignals,
    config: &AdaptationConfig,
) -> AdaptationSettings {
    let connection = signals
        .connection_quality
        .unwrap_or(ConnectionQuality::Good);
    let minutes = signals.time_available_minutes.unwrap_or(60);
    let device = signals.device.unwrap_or(DeviceKind::Desktop);

    let mut settings = AdaptationSettings {
        max_results: config.baseline_max_results,
        layout: Layout::Grid,
        description_length: DescriptionLength::Long,
        show_images: true,
        trail: Vec::new(),
    };

    // Bandwidth rule: spare a poor connection the image payload.
    if connection == ConnectionQuality::Poor {
        settings.show_images = false;
        settings.trail.push(AdaptationNote {
            effect: "show_images=false".to_string(),
            reason: "hiding images because connection is poor".to_string(),
        });
    }

    // Time rule: a short visit gets a short, focused page.
    if minutes <= config.short_visit_minutes {
        settings.max_results = config.short_visit_max_results;
        settings.description_length = DescriptionLength::Short;
        settings.trail.push(AdaptationNote {
            effect: format!(
                "max_results={}, description_length=short",
                config.short_visit_max_results
            ),
            reason: format!(
                "showing fewer, shorter results because you have {} minutes",
                minutes
            ),
        });
    }

    // Mobile rule: single-column list, same number of museums as desktop.
    if device == DeviceKind::Mobile {
        settings.layout = Layout::List;
        settings.trail.push(AdaptationNote {
            effect: "layout=list".to_string(),
            reason: "using list layout for mobile".to_string(),
        });
    }

    settings
}
