use std::path::PathBuf;

use manor_engine::{
    builtin_mansion_blueprint, load_mansion_blueprint, resolve_app_paths, AppError, LoopConfig,
    MansionBlueprint, PresentationLog, Scene, BUILTIN_MANSION_PATH,
};
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::config::{ConfigError, GameConfig};
use super::gameplay::{self, WorldBuildError};

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    App(#[from] AppError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to build mansion: {0}")]
    World(#[from] WorldBuildError),
}

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scene: Box<dyn Scene>,
    pub(crate) presenter: PresentationLog,
    pub(crate) script_path: Option<PathBuf>,
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    init_tracing();
    info!("=== Manor Startup ===");

    let game_config = GameConfig::from_env()?;
    let blueprint = resolve_blueprint(&game_config)?;
    wire(&game_config, &blueprint)
}

/// Everything after config and blueprint resolution, so tests can wire a scene without env or disk.
pub(crate) fn wire(
    game_config: &GameConfig,
    blueprint: &MansionBlueprint,
) -> Result<AppWiring, BootstrapError> {
    game_config.validate_start_room(blueprint.room_count())?;
    let scene = gameplay::build_scene(blueprint, game_config.start_room)?;
    let presenter = PresentationLog::new()
        .with_echo_to_log(game_config.echo_presentation)
        .with_speech_available(game_config.speech_enabled)
        .with_audio_available(game_config.audio_enabled);
    let config = LoopConfig {
        target_tps: game_config.target_tps,
        max_ticks_per_advance: game_config.max_ticks_per_advance,
        ..LoopConfig::default()
    };
    info!(
        rooms = blueprint.room_count(),
        start_room = game_config.start_room,
        speech = game_config.speech_enabled,
        audio = game_config.audio_enabled,
        "app_wired"
    );

    Ok(AppWiring {
        config,
        scene,
        presenter,
        script_path: game_config.script_path.clone(),
    })
}

/// Explicit path first, then `assets/base/rooms.xml` under the project root, then the embedded copy.
fn resolve_blueprint(game_config: &GameConfig) -> Result<MansionBlueprint, AppError> {
    if let Some(path) = &game_config.blueprint_path {
        let blueprint = load_mansion_blueprint(path)?;
        info!(path = %path.display(), rooms = blueprint.room_count(), "blueprint_loaded");
        return Ok(blueprint);
    }

    match resolve_app_paths() {
        Ok(paths) => {
            let path = paths.default_blueprint_path();
            if path.is_file() {
                let blueprint = load_mansion_blueprint(&path)?;
                info!(path = %path.display(), rooms = blueprint.room_count(), "blueprint_loaded");
                return Ok(blueprint);
            }
        }
        Err(error) => warn!(error = %error, "app_root_unresolved"),
    }

    let blueprint = builtin_mansion_blueprint()?;
    info!(path = BUILTIN_MANSION_PATH, rooms = blueprint.room_count(), "blueprint_loaded");
    Ok(blueprint)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_rejects_start_room_past_the_last_room() {
        let blueprint = builtin_mansion_blueprint().expect("builtin");
        let config = GameConfig {
            start_room: blueprint.room_count(),
            ..GameConfig::default()
        };
        assert!(matches!(
            wire(&config, &blueprint),
            Err(BootstrapError::Config(ConfigError::Invalid { field: "start_room", .. }))
        ));
    }

    #[test]
    fn wire_carries_loop_and_presenter_settings() {
        let blueprint = builtin_mansion_blueprint().expect("builtin");
        let config = GameConfig {
            target_tps: 30,
            script_path: Some(PathBuf::from("demo.txt")),
            ..GameConfig::default()
        };
        let wiring = wire(&config, &blueprint).expect("wire");
        assert_eq!(wiring.config.target_tps, 30);
        assert_eq!(wiring.script_path, Some(PathBuf::from("demo.txt")));
        assert!(wiring.presenter.events().is_empty());
    }
}
