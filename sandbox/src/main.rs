// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use anyhow::{Context, Result};
use mroutine_core::{FrameClock, LifetimeSignal, SchedulerConfig};
use mroutine_runtime::{sequence, Handle, Scheduler, Script, Yielded};
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

const FRAME_BUDGET: Duration = Duration::from_millis(16);
const MAX_FRAMES: u64 = 600;

/// A routine that blinks a few times, spacing the blinks in game time.
fn blinker(name: &'static str, blinks: u32) -> Script {
    let mut script = Script::new();
    for i in 1..=blinks {
        script = script.step(move |cx| {
            log::info!("[{name}] blink {i}/{blinks} at frame {}", cx.frame());
            Some(cx.scheduler().wait_seconds(0.25))
        });
    }
    script
}

/// Spawns two blinkers, waits for both, then hands over to a nested wrap-up.
fn director(scheduler: &Scheduler) -> Result<Handle> {
    let left = scheduler.create(blinker("left", 3));
    let right = scheduler.create(blinker("right", 5));
    left.start()?;
    right.start()?;

    let handle = scheduler.create(
        Script::new()
            .step(move |cx| {
                log::info!("[director] waiting on {left:?} and {right:?}");
                Some(
                    cx.scheduler()
                        .wait_all([Yielded::from(left), Yielded::from(right)]),
                )
            })
            .step(|_| {
                Some(Yielded::nested(
                    Script::new()
                        .step(|cx| {
                            log::info!("[wrap-up] settling for 10 frames");
                            Some(cx.scheduler().wait_frames(10))
                        })
                        .step(|cx| {
                            log::info!("[wrap-up] done at frame {}", cx.frame());
                            None
                        }),
                ))
            }),
    );
    handle.callback(|| log::info!("[director] finished"));
    Ok(handle)
}

/// A routine that would run forever, bound to a lifetime the host ends.
fn heartbeat(scheduler: &Scheduler, lifetime: &LifetimeSignal) -> Result<Handle> {
    let handle = scheduler.create(sequence::from_fn(|cx| {
        log::debug!("[heartbeat] frame {}", cx.frame());
        Some(cx.scheduler().wait_frames(30))
    }));
    handle.attach(lifetime.clone())?;
    handle.callback(|| log::info!("[heartbeat] stopped with its owner"));
    handle.start()?;
    Ok(handle)
}

fn load_config() -> Result<SchedulerConfig> {
    match std::env::args().nth(1) {
        Some(path) => SchedulerConfig::from_file(&path)
            .with_context(|| format!("Failed to load scheduler config from '{path}'")),
        None => Ok(SchedulerConfig::default()),
    }
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = load_config()?;
    log::info!("Starting sandbox with {config:?}");
    let scheduler = Scheduler::new(config);

    let owner = LifetimeSignal::new();
    let heartbeat = heartbeat(&scheduler, &owner)?;
    let director = director(&scheduler)?;

    let done = Rc::new(Cell::new(false));
    let flag = done.clone();
    director.callback(move || flag.set(true));
    director.start()?;

    let mut clock = FrameClock::new();
    while !done.get() && scheduler.frame() < MAX_FRAMES {
        std::thread::sleep(FRAME_BUDGET);
        scheduler.tick(clock.step())?;
    }

    // The host object owning the heartbeat goes away.
    owner.deactivate();
    scheduler.tick(clock.step())?;

    log::info!(
        "Sandbox finished after {} frames, heartbeat {:?}, {} processor slot(s) allocated",
        scheduler.frame(),
        heartbeat.state(),
        scheduler.allocated_processors()
    );
    Ok(())
}
