//! Haunted-mansion gameplay: room progression, rewards, hints and the scene that drives them.

mod hints;
mod objectives;
mod player;
mod progression;
mod rewards;
mod rooms;
mod scene;
mod types;
mod world;

use manor_engine::{MansionBlueprint, Scene};

pub(crate) use world::WorldBuildError;

use scene::MansionScene;
use world::MansionWorld;

pub(crate) fn build_scene(
    blueprint: &MansionBlueprint,
    start_room: usize,
) -> Result<Box<dyn Scene>, WorldBuildError> {
    let world = MansionWorld::from_blueprint(blueprint)?;
    Ok(Box::new(MansionScene::new(world, start_room)))
}
