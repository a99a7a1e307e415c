mod color;
mod config;
mod error;
mod fx;
mod gpu;
mod scene;
mod tween;
mod viewer;

#[cfg(test)]
mod tests;

use std::cell::RefCell;
use std::rc::Rc;

use config::ShowcaseConfig;
use scene::nodes::Vector;
use tween::{EaseMode, Easing, Scheduler, Tween};

fn main() {
    // Ignore a second init (the test harness calls main too)
    let _ = env_logger::try_init();

    // Check for command line arguments
    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("--show") => {
            let config = ShowcaseConfig::default().with_flags(args[2..].iter().map(String::as_str));
            if let Err(e) = viewer::run_viewer(config) {
                log::error!("{}", e);
                eprintln!("Error: {}", e);
            }
        }
        Some("--kernel") => {
            let sigma = args.get(2).and_then(|s| s.parse::<f32>().ok());
            match sigma {
                Some(sigma) => print_kernel(sigma),
                None => eprintln!("--kernel expects a numeric sigma"),
            }
        }
        Some("--benchmark") => run_benchmark(),
        _ => {
            println!("Particle Showcase");
            println!("Run with --show [--mobile] [--debug] to open the viewer");
            println!("Run with --kernel <sigma> to print a blur kernel");
            println!("Run with --benchmark to test performance");
        }
    }
}

fn print_kernel(sigma: f32) {
    let kernel = fx::build_kernel(sigma);
    println!("sigma {} -> {} taps", sigma, kernel.len());
    for (i, weight) in kernel.iter().enumerate() {
        println!("  [{:2}] {:.6}", i, weight);
    }
    println!("  sum  {:.6}", kernel.iter().sum::<f32>());
}

fn run_benchmark() {
    use std::time::Instant;

    println!("=== Tween Scheduler Benchmark ===\n");

    let counts = [1_000, 10_000, 50_000];
    let frames = 120;

    for count in counts {
        let mut scheduler = Scheduler::init();
        let start = Instant::now();
        for i in 0..count {
            let target = Rc::new(RefCell::new(Vector::default()));
            let tween = Tween::builder(target)
                .to("x", 100.0)
                .to("y", -50.0)
                .to("z", 25.0)
                .duration(2000.0)
                .delay((i % 100) as f64)
                .easing(Easing::Exponential(EaseMode::In))
                .build();
            match tween {
                Ok(tween) => {
                    let id = scheduler.insert(tween);
                    if let Err(e) = scheduler.start(id, 0.0) {
                        eprintln!("start failed: {}", e);
                        return;
                    }
                }
                Err(e) => {
                    eprintln!("build failed: {}", e);
                    return;
                }
            }
        }
        let setup_ms = start.elapsed().as_secs_f64() * 1000.0;

        let start = Instant::now();
        for frame in 0..frames {
            scheduler.update(frame as f64 * 16.0);
        }
        let update_ms = start.elapsed().as_secs_f64() * 1000.0 / frames as f64;

        println!("Tweens: {}", count);
        println!("-----------------------");
        println!("  Setup:  {:.3} ms", setup_ms);
        println!("  Update: {:.3} ms/frame", update_ms);
        println!("  Active after {} frames: {}", frames, scheduler.active_count());
        println!();
    }

    // Shape generation fans out over rayon
    println!("=== Shape Generation ===\n");
    let config = ShowcaseConfig::default();
    let iterations = 10;
    let start = Instant::now();
    let mut vertices = 0;
    for _ in 0..iterations {
        let shapes = scene::shapes::build_shapes(config.profile.layout(), config.shape_hue, config.shape_lightness);
        vertices = shapes.iter().map(scene::Shape::len).sum::<usize>();
    }
    let avg_ms = start.elapsed().as_secs_f64() * 1000.0 / iterations as f64;
    println!("  {} vertices across 6 shapes: {:.3} ms/build", vertices, avg_ms);
}
