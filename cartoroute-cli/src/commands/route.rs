//! Route and nearest commands - query the road network.

use std::path::PathBuf;

use cartoroute::geo::ProjectedPoint;
use cartoroute::route::PathPlanner;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the route command.
pub struct RouteArgs {
    pub from: ProjectedPoint,
    pub to: ProjectedPoint,
    pub graph: Option<PathBuf>,
}

/// Plan a route and print its points, one `X,Y` per line.
pub fn run_route(runner: &CliRunner, args: RouteArgs) -> Result<(), CliError> {
    let planner = PathPlanner::new(runner.open_gateway(args.graph.as_deref())?);
    let (route, stats) = planner.plan(args.from, args.to)?;

    match route {
        Some(route) => {
            println!(
                "Route: {} points over {} vertices, cost {:.1}",
                route.points.len(),
                route.vertices.len(),
                route.cost
            );
            for point in &route.points {
                println!("{}", point);
            }
        }
        None => println!("No route between {} and {}", args.from, args.to),
    }

    println!(
        "Search: {} expanded, {} edge queries, peak frontier {}",
        stats.expanded, stats.edge_queries, stats.peak_frontier
    );
    Ok(())
}

/// Print the closest road point to `at`.
pub fn run_nearest(
    runner: &CliRunner,
    at: ProjectedPoint,
    graph: Option<PathBuf>,
) -> Result<(), CliError> {
    let planner = PathPlanner::new(runner.open_gateway(graph.as_deref())?);
    let road = planner.nearest_road_point(at)?;

    println!("{}", road.point);
    println!("Distance: {:.1} m", road.distance);
    Ok(())
}
