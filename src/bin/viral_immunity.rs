//! Command-line front end: run one simulation, save the results, render plots.
//!
//! ```text
//! viral-immunity --duration 45 --k-a 1.0 --plots linear,log,phase --csv
//! viral-immunity --json --beta 0.8 > run.json
//! RUST_LOG=debug viral-immunity --trace
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use viral_immunity::{
    EngineConfig, PlotMode, SimulationRequest, SimulationResponse, SimulationService,
    export::{save_csv, save_run},
    plot,
};

#[derive(Parser)]
#[command(name = "viral-immunity")]
#[command(about = "Viral infection & immune response simulation", long_about = None)]
struct Cli {
    /// Engine configuration JSON (defaults are used if missing)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Simulation duration in days
    #[arg(short, long)]
    duration: Option<f64>,

    /// Plot mode echoed in the JSON payload: linear, log or phase
    #[arg(long)]
    plot_type: Option<String>,

    /// Infection rate
    #[arg(long)]
    beta: Option<f64>,
    /// Infected cell death rate
    #[arg(long)]
    delta: Option<f64>,
    /// T-cell killing rate
    #[arg(long)]
    k_t: Option<f64>,
    /// Antibody neutralization rate
    #[arg(long)]
    k_a: Option<f64>,
    /// Virion production per infected cell
    #[arg(long)]
    p: Option<f64>,
    /// Free virus clearance
    #[arg(long)]
    c: Option<f64>,
    /// T-cell proliferation
    #[arg(long)]
    r: Option<f64>,
    /// Half-saturation of T-cell proliferation
    #[arg(long)]
    theta: Option<f64>,
    /// T-cell stimulation
    #[arg(long)]
    s_t: Option<f64>,
    /// T-cell decay
    #[arg(long)]
    d_t: Option<f64>,
    /// Antibody production
    #[arg(long)]
    s_a: Option<f64>,
    /// Antibody decay
    #[arg(long)]
    d_a: Option<f64>,
    /// Infected-cell carrying capacity (K)
    #[arg(long)]
    carrying_capacity: Option<f64>,
    /// Initial viral load
    #[arg(long)]
    v0: Option<f64>,
    /// Initial infected cells
    #[arg(long)]
    i0: Option<f64>,
    /// Initial T cells
    #[arg(long)]
    t0: Option<f64>,
    /// Initial antibodies
    #[arg(long)]
    a0: Option<f64>,

    /// Directory to save results
    #[arg(short, long, default_value = "results")]
    output_dir: PathBuf,

    /// Plots to render (comma-separated: linear,log,phase)
    #[arg(long, value_delimiter = ',')]
    plots: Vec<String>,

    /// Also write simulation_results.csv
    #[arg(long)]
    csv: bool,

    /// Print the JSON response envelope to stdout
    #[arg(long)]
    json: bool,

    /// Print every reported sample
    #[arg(long)]
    trace: bool,
}

impl Cli {
    fn request(&self) -> SimulationRequest {
        SimulationRequest {
            duration: self.duration,
            plot_type: self.plot_type.clone(),
            beta: self.beta,
            delta: self.delta,
            p: self.p,
            c: self.c,
            k_t: self.k_t,
            k_a: self.k_a,
            r: self.r,
            theta: self.theta,
            s_t: self.s_t,
            d_t: self.d_t,
            s_a: self.s_a,
            d_a: self.d_a,
            carrying_capacity: self.carrying_capacity,
            v0: self.v0,
            i0: self.i0,
            t0: self.t0,
            a0: self.a0,
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::load_or_default(path),
        None => EngineConfig::default(),
    };
    let service = SimulationService::new(Arc::new(config))?;

    log::info!("Running simulation...");
    let result = service.run(&cli.request());

    if cli.json {
        println!("{}", SimulationResponse::from(&result).to_json()?);
    }

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            log::error!("Simulation failed: {}", e);
            return Err(e.into());
        }
    };

    if cli.trace {
        println!("Time, V, I, T, A");
        for (t, s) in outcome.trajectory.iter() {
            println!("{:.3}, {:.4e}, {:.4e}, {:.4e}, {:.4e}", t, s.v, s.i, s.t, s.a);
        }
    }

    let m = &outcome.metrics;
    if !cli.json {
        println!("Peak viral load:  {:.4e} at day {:.2}", m.peak_viral_load, m.peak_viral_time);
        match m.clearance_time {
            Some(t) => println!("Clearance time:   day {:.2}", t),
            None => println!("Clearance time:   not reached"),
        }
        println!("Max T cells:      {:.4e}", m.max_t_cells);
        println!("Peak antibodies:  {:.4e}", m.peak_antibodies);
    }

    log::info!("Saving results...");
    save_run(&outcome, service.config(), &cli.output_dir)?;
    if cli.csv {
        save_csv(&outcome.trajectory, cli.output_dir.join("simulation_results.csv"))?;
    }

    for name in &cli.plots {
        match name.parse::<PlotMode>() {
            Ok(mode) => {
                let path = cli.output_dir.join(format!("{}_plot.png", mode));
                plot::save_png(&outcome.trajectory, mode, &path)?;
            }
            Err(_) => log::warn!("Unknown plot type: {}", name),
        }
    }

    log::info!("Simulation completed successfully");
    Ok(())
}
