use bevy::log::{Level, LogPlugin};
use bevy::prelude::*;
use clap::Parser;

use terrain_solid::config::Args;
use terrain_solid::{pipeline, raster};

fn main() -> AppExit {
    let args = Args::parse();
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };

    // No runner plugin: the app performs a single update, running the
    // conversion once as a startup system
    App::new()
        .add_plugins(LogPlugin {
            level,
            ..default()
        })
        .insert_resource(args)
        .add_systems(Startup, convert_system)
        .run()
}

/// Run the conversion described by the command line
fn convert_system(args: Res<Args>, mut exit: EventWriter<AppExit>) {
    let registry = raster::initialize();

    match pipeline::run(registry, &args.to_options()) {
        Ok(format) => {
            info!("Done ({:?} written to {:?})", format, args.output);
        }
        Err(e) => {
            error!("Error: {}", e);
            exit.send(AppExit::error());
        }
    }
}
