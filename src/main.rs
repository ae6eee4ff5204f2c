use cassegrain::{
    batch_io::{load_configurations, save_results},
    console::{show_intro, Args, PartialArgs},
    error::CsgResult,
    evaluator::{BatchResult, ConfigurationEvaluator},
    run_config::RunConfig,
    surface::SensorChip,
    utils::length_in_mm,
};
use clap::Parser;
use env_logger::Env;
use log::warn;

fn read_run_config(args: &Args) -> CsgResult<RunConfig> {
    let mut run_config = match &args.config {
        Some(path) => RunConfig::from_file(path)?,
        None => RunConfig::default(),
    };
    if let Some(top_n) = args.top_n {
        run_config.top_n = top_n;
    }
    if let Some(nr_of_rays) = args.nr_of_rays {
        run_config.evaluator.nr_of_rays = nr_of_rays;
    }
    Ok(run_config)
}

fn print_ranking(ranked: &[BatchResult], nr_of_printed: usize, chip: &SensorChip) {
    println!("\nTop {} configurations:", nr_of_printed.min(ranked.len()));
    for (idx, result) in ranked.iter().take(nr_of_printed).enumerate() {
        let optimization = &result.optimization;
        let efl = length_in_mm(result.configuration.system_focal_length);
        let (fov_width, fov_height) = chip.field_of_view_arcmin(efl);
        println!(
            "{:>3}. score {:.2} | hits {} ({:.2}%) | rms {:.4} mm | secondary at ({:.2}, {:.2}) mm | row {}",
            idx + 1,
            result.score,
            optimization.hits,
            optimization.hit_percentage,
            optimization.rms_spot_size,
            optimization.best_position.x,
            optimization.best_position.y,
            result.configuration.row_index
        );
        println!("     {}", result.configuration);
        println!(
            "     plate scale {:.3}\"/px | field of view {:.1}' x {:.1}'",
            chip.angular_resolution_arcsec(efl),
            fov_width,
            fov_height
        );
    }
}

fn main() -> CsgResult<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));
    show_intro();

    //parse CLI arguments
    let args = Args::try_from(PartialArgs::parse())?;
    let run_config = read_run_config(&args)?;

    let configurations = load_configurations(&args.input)?;
    if configurations.is_empty() {
        warn!("no configurations found in {}", args.input.display());
    }
    let mut evaluator = ConfigurationEvaluator::new(run_config.evaluator);
    if let Some(budget) = run_config.time_budget() {
        evaluator = evaluator.with_time_budget(budget);
    }
    let ranked = evaluator.rank(&configurations, run_config.top_n);

    if let Some(best) = ranked.first() {
        best.configuration
            .build_system_at(evaluator.settings(), best.optimization.best_position)?
            .log_summary();
    }
    print_ranking(&ranked, run_config.nr_of_printed, &run_config.chip);
    save_results(&args.output, &ranked)?;
    println!("\nResults written to {}", args.output.display());
    Ok(())
}
