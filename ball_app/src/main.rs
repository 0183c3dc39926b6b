//! Ball demo application
//!
//! Drives the engine core without a renderer: spawns Ball behaviours
//! through the scene's instantiation pipeline, runs a fixed number of
//! update batches, persists one ball's state through the serializer, and
//! tears everything down.

use std::any::Any;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use nalgebra::Vector2;

use scape_core::engine::events::{dispatch_start, dispatch_update};
use scape_core::foundation::time::Timer;
use scape_core::prelude::*;
use scape_core::serialization::schema::ReflectError;

const SCREEN_CENTER: (f32, f32) = (400.0, 300.0);

struct Ball {
    state: BehaviourState,
    game_object: SharedGameObject,
    speed: f32,
}

impl Behaviour for Ball {
    fn state(&self) -> &BehaviourState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut BehaviourState {
        &mut self.state
    }

    fn game_object(&self) -> Option<&SharedGameObject> {
        Some(&self.game_object)
    }
}

impl Spawnable for Ball {
    fn spawn() -> Result<Self, SpawnError> {
        Ok(Self {
            state: BehaviourState::new("Ball"),
            game_object: GameObject::shared("Ball"),
            speed: 100.0,
        })
    }

    fn type_name() -> &'static str {
        "Ball"
    }
}

impl UpdateBehaviour for Ball {
    fn start(&mut self, _event: &StartBatchEvent) {
        let mut game_object = self.game_object.lock().expect("game object lock");
        game_object.transform.position = Vector2::new(SCREEN_CENTER.0, SCREEN_CENTER.1);
    }

    fn update(&mut self, event: &UpdateBatchEvent) {
        let mut game_object = self.game_object.lock().expect("game object lock");
        let delta = Vector2::new(self.speed * event.delta_time, 0.0);
        game_object.transform.translate(delta);
    }
}

static BALL_DESCRIPTOR: TypeDescriptor = TypeDescriptor {
    type_name: "Ball",
    base: None,
    is_enum: false,
    fields: &[FieldDescriptor {
        name: "speed",
        kind: WireKind::F32,
    }],
    properties: &[],
};

impl Reflect for Ball {
    fn descriptor(&self) -> &'static TypeDescriptor {
        &BALL_DESCRIPTOR
    }

    fn get_field(&self, name: &str) -> Option<WireValue> {
        match name {
            "speed" => Some(WireValue::F32(self.speed)),
            _ => None,
        }
    }

    fn set_field(&mut self, name: &str, value: WireValue) -> Result<(), ReflectError> {
        match (name, value) {
            ("speed", WireValue::F32(v)) => {
                self.speed = v;
                Ok(())
            }
            ("speed", other) => Err(ReflectError::KindMismatch {
                type_name: "Ball",
                member: "speed",
                expected: WireKind::F32,
                actual: other.kind(),
            }),
            (other, _) => Err(ReflectError::NoSuchMember {
                type_name: "Ball",
                member: other.to_string(),
            }),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    scape_core::foundation::logging::init();

    let settings = match EngineSettings::load_from_file("ball_app/settings.toml") {
        Ok(settings) => settings,
        Err(error) => {
            log::warn!("falling back to default settings: {error}");
            EngineSettings::default()
        }
    };

    let mut context = EngineContext::new(settings);
    context.serialization.add_type(&BALL_DESCRIPTOR);

    let id = context.scenes.add_scene(Scene::new("playground", 0)?);
    context.scenes.set_current_scene(id);
    let scene = context.scenes.get(id).ok_or("scene was not registered")?;

    // One synchronous spawn, then a batch of async ones.
    let mut balls = vec![scene.add_to_scene::<Ball>()?];
    for pending in scene.add_to_scene_many_async::<Ball>(4)? {
        balls.push(pending.wait()?);
    }
    log::info!(
        "scene `{}` tracks {} behaviours across {} game objects",
        scene.name,
        scene.behaviour_count(),
        scene.game_object_count()
    );

    // Fixed-length host loop standing in for the graphics framework.
    let mut timer = Timer::new();
    for _ in 0..120 {
        timer.update();
        let start = StartBatchEvent {
            total_time: timer.total_time(),
        };
        let update = UpdateBatchEvent {
            delta_time: timer.delta_time(),
            total_time: timer.total_time(),
        };
        for ball in &balls {
            let mut guard = ball.lock().expect("ball lock");
            dispatch_start(&mut *guard, &start);
            dispatch_update(&mut *guard, &update);
        }
        thread::sleep(Duration::from_millis(4));
    }

    // Persist one ball's tunables and its transform.
    let snapshot_dir = std::env::temp_dir();
    {
        let guard = balls[0].lock().expect("ball lock");
        let output = context.serialization.serialize_to_path(&*guard, &snapshot_dir, true);
        if output.is_ok() {
            log::info!(
                "serialized ball ({} payload bytes) into `{}`",
                output.size,
                output.path.display()
            );
        } else {
            log::error!("ball serialization failed: {}", output.error);
        }

        if let Some(game_object) = guard.game_object() {
            let transform = game_object.lock().expect("game object lock").transform.clone();
            log::info!(
                "final position after the run: ({:.1}, {:.1})",
                transform.position.x,
                transform.position.y
            );
            let output = context.serialization.serialize_to_path(&transform, &snapshot_dir, false);
            if !output.is_ok() {
                log::error!("transform serialization failed: {}", output.error);
            }
        }
    }

    // Removed instances go back to their type's pool.
    if let Some(ball) = balls.pop() {
        let handle: DynBehaviour = ball.clone();
        scene.remove_from_scene(&handle);
        log::info!("{} behaviours remain tracked", scene.behaviour_count());
    }

    context.shutdown();
    Ok(())
}
