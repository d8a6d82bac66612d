use anyhow::anyhow;
use clap::Parser;
use course_dashboard::app::CourseDashboardApp;
use course_dashboard::config::Cli;
use eframe::egui;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = Cli::parse().into_config()?;
    log::info!(
        "Historical data: {}, predictions: {}",
        config.historical_path.display(),
        config.predictions_path.display()
    );

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([800.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Painel de Análise de Cursos",
        options,
        Box::new(|_cc| Ok(Box::new(CourseDashboardApp::new(config)))),
    )
    .map_err(|e| anyhow!("running the dashboard window: {e}"))
}
