use anyhow::Context;
use factorised::distr::*;
use factorised::model::Model;
use nalgebra::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use structopt::StructOpt;
use tracing_subscriber::EnvFilter;

/// Samples a factorised distribution, evaluates its log-density and entropy,
/// and its divergence against itself.
#[derive(StructOpt, Debug)]
#[structopt(name = "factorised-demo")]
pub struct Demo {

    /// JSON model definition. When absent, uses MultiNormal(0, I_3) x Dirichlet(1, 1, 1, 1).
    #[structopt(short, long)]
    model : Option<String>,

    /// Number of draws per batch element.
    #[structopt(short = "n", long, default_value = "1000")]
    samples : usize,

    /// Batch size of the default model (ignored when a model file is informed).
    #[structopt(short, long, default_value = "5")]
    batch : usize,

    #[structopt(short, long, default_value = "0")]
    seed : u64,

    /// Writes the drawn samples to this CSV file.
    #[structopt(short, long)]
    output : Option<String>

}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("FACTORISED_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn default_model(batch : usize) -> anyhow::Result<Factorised> {
    let mn = MultiNormal::standard(3)?.expand(batch)?;
    let dir = Dirichlet::new(DVector::from_element(4, 1.))?.expand(batch)?;
    Ok(Factorised::new(vec![Arc::new(mn), Arc::new(dir)])?)
}

fn write_samples(path : &str, samples : &DMatrix<f64>) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Could not create {}", path) )?;
    let header : Vec<String> = (0..samples.ncols()).map(|i| format!("x{}", i) ).collect();
    wtr.write_record(&header)?;
    for row in samples.row_iter() {
        wtr.write_record(row.iter().map(|x| x.to_string() ))?;
    }
    wtr.flush()?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let demo = Demo::from_args();

    let (dist, div) = match &demo.model {
        Some(path) => {
            let model = Model::load_from_path(path)
                .with_context(|| format!("Could not load model {}", path) )?;
            (model.build()?, model.divergence())
        },
        None => (default_model(demo.batch)?, Default::default())
    };
    tracing::info!(model = %dist, "model ready");

    let mut rng = StdRng::seed_from_u64(demo.seed);
    let x = if dist.has_rsample() {
        dist.rsample(demo.samples, &mut rng)?
    } else {
        dist.sample(demo.samples, &mut rng)?
    };
    println!("{}", dist);
    println!("sample shape: {} x {}", x.nrows(), x.ncols());

    let lp = dist.log_prob((&x).into())?;
    println!("log_prob shape: {}", lp.nrows());

    let batch = dist.batch_shape();
    let mut mc_entropy = DVector::<f64>::zeros(batch);
    for (r, l) in lp.iter().enumerate() {
        mc_entropy[r % batch] -= l / demo.samples.max(1) as f64;
    }
    match dist.entropy() {
        Ok(h) => {
            for j in 0..batch {
                println!("entropy[{}]: {:.4} (monte carlo: {:.4})", j, h[j], mc_entropy[j]);
            }
        },
        Err(e) => println!("entropy unavailable: {}", e)
    }

    let kl = div.kl(&dist, &dist)?;
    println!("kl(p || p): {:?}", kl.as_slice());

    if let Some(path) = &demo.output {
        write_samples(path, &x)?;
        tracing::info!(path = %path, rows = x.nrows(), "samples written");
    }
    Ok(())
}
