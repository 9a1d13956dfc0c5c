//! Train a gated hyperplane ensemble on a small 2D dataset and classify a few points.
//!
//! Run with `RUST_LOG=hyperchip=debug` to see the training stages.

use hyperchip::{Chip, Classifier, ClusterId, Dataset, Gating, NearestSupport};
use tracing_subscriber::EnvFilter;

fn main() -> hyperchip::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Two classes separated along x, plus one mislabeled point.
    let data: Vec<Vec<f32>> = vec![
        // Class "left" (near origin)
        vec![0.0, 0.0],
        vec![0.3, 0.9],
        vec![-0.4, 0.5],
        vec![0.5, -0.6],
        vec![-0.2, -0.8],
        // Class "right" (near (4, 0))
        vec![4.0, 0.0],
        vec![4.2, 0.8],
        vec![3.7, 0.4],
        vec![4.4, -0.5],
        vec![3.9, -0.9],
        // Noise: labeled "left" inside "right"
        vec![4.1, 0.1],
    ];
    let labels: Vec<ClusterId> = ["left"; 5]
        .into_iter()
        .chain(["right"; 5])
        .chain(["left"])
        .map(ClusterId::from)
        .collect();

    let mut dataset = Dataset::new(&data, &labels)?;
    let model = Chip::new().with_seed(42).fit_dataset(&mut dataset)?;

    println!("=== Training ===");
    for v in dataset.vertices() {
        let state = if dataset.is_active(v.id()) { "kept" } else { "removed" };
        println!(
            "  point {:2} ({:5.1}, {:5.1}) {:>5}  q = {:.2}  {}",
            v.id(),
            v.coordinates()[0],
            v.coordinates()[1],
            v.cluster().to_string(),
            v.quality(),
            state
        );
    }
    println!("  experts: {}", model.experts().len());
    for (polarity, id) in model.bimap().entries() {
        println!("  {:?} => {}", polarity, id);
    }

    let queries: Vec<Vec<f32>> = vec![
        vec![-1.0, 0.0],
        vec![1.5, 0.5],
        vec![2.5, -0.5],
        vec![5.0, 1.0],
    ];
    let hard = model.clone().with_gating(Gating::Hard);
    let nearest = NearestSupport::from_dataset(&dataset)?;

    println!("\n=== Predictions (soft / hard / nearest support) ===");
    for x in &queries {
        println!(
            "  ({:5.1}, {:5.1}) => {} / {} / {}",
            x[0],
            x[1],
            model.predict(x)?,
            hard.predict(x)?,
            nearest.predict(x)?
        );
    }

    Ok(())
}
