//! Dedicated render thread.
//!
//! The worker owns the [`RenderContext`]; callers only share the scene. Each
//! request locks the scene once for its whole scatter, render and read-back,
//! so a fitting iteration never sees parameters written by another caller
//! halfway through.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crate::scene::{RenderReport, Scene};

use super::{Image, RenderContext, RenderError, RenderOptions};

/// Result of one worker render.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOutput {
    pub epoch: f64,
    pub image: Image,
    pub report: RenderReport,
}

type Reply = mpsc::Sender<Result<Vec<RenderOutput>, RenderError>>;

enum Request {
    Render {
        /// Free values to scatter before the first frame.
        buffer: Option<Vec<f64>>,
        epochs: Vec<f64>,
        reply: Reply,
    },
    Shutdown,
}

#[derive(Debug)]
pub struct RenderWorker {
    requests: mpsc::Sender<Request>,
    handle: Option<JoinHandle<()>>,
    options: RenderOptions,
}

impl RenderWorker {
    pub fn spawn(scene: Arc<Mutex<Scene>>, options: RenderOptions) -> Result<Self, RenderError> {
        let ctx = RenderContext::new(options)?;
        let (requests, inbox) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("render-worker".to_owned())
            .spawn(move || serve(ctx, &scene, &inbox))?;
        log::debug!(
            "render worker started ({}x{}, scale {})",
            options.width,
            options.height,
            options.scale
        );
        Ok(Self {
            requests,
            handle: Some(handle),
            options,
        })
    }

    #[must_use]
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Renders the current scene at the configured epoch and blocks until
    /// the image is read back.
    pub fn render(&self) -> Result<RenderOutput, RenderError> {
        self.request(None, vec![self.options.epoch])?
            .pop()
            .ok_or(RenderError::WorkerUnavailable)
    }

    /// One frame per epoch, all from the same scene state.
    pub fn render_epochs(&self, epochs: &[f64]) -> Result<Vec<RenderOutput>, RenderError> {
        self.request(None, epochs.to_vec())
    }

    /// Scatters `buffer` into the scene and renders every epoch without
    /// releasing the scene in between. A rejected buffer leaves the scene
    /// unchanged and renders nothing.
    pub fn scatter_and_render(
        &self,
        buffer: &[f64],
        epochs: &[f64],
    ) -> Result<Vec<RenderOutput>, RenderError> {
        self.request(Some(buffer.to_vec()), epochs.to_vec())
    }

    fn request(
        &self,
        buffer: Option<Vec<f64>>,
        epochs: Vec<f64>,
    ) -> Result<Vec<RenderOutput>, RenderError> {
        let (reply, response) = mpsc::channel();
        self.requests
            .send(Request::Render {
                buffer,
                epochs,
                reply,
            })
            .map_err(|_| RenderError::WorkerUnavailable)?;
        response.recv().map_err(|_| RenderError::WorkerUnavailable)?
    }
}

impl Drop for RenderWorker {
    fn drop(&mut self) {
        let _ = self.requests.send(Request::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("render worker panicked");
            }
        }
    }
}

fn serve(mut ctx: RenderContext, scene: &Mutex<Scene>, inbox: &mpsc::Receiver<Request>) {
    for request in inbox {
        match request {
            Request::Render {
                buffer,
                epochs,
                reply,
            } => {
                let result = match scene.lock() {
                    Ok(mut scene) => {
                        render_locked(&mut ctx, &mut scene, buffer.as_deref(), &epochs)
                    }
                    Err(_) => Err(RenderError::Poisoned),
                };
                // the caller may have given up waiting
                let _ = reply.send(result);
            }
            Request::Shutdown => break,
        }
    }
    log::debug!("render worker stopped");
}

fn render_locked(
    ctx: &mut RenderContext,
    scene: &mut Scene,
    buffer: Option<&[f64]>,
    epochs: &[f64],
) -> Result<Vec<RenderOutput>, RenderError> {
    if let Some(buffer) = buffer {
        scene.scatter_parameters(buffer)?;
    }
    let mut frames = Vec::with_capacity(epochs.len());
    for &epoch in epochs {
        ctx.set_epoch(epoch);
        let report = scene.render_all(ctx);
        frames.push(RenderOutput {
            epoch,
            image: ctx.read_back(),
            report,
        });
    }
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use std::thread;

    use super::RenderWorker;
    use crate::geom::TessellationOptions;
    use crate::position::{LinearMotion, Position};
    use crate::primitives::{Disk, Primitive};
    use crate::render::{RenderContext, RenderError, RenderOptions};
    use crate::scene::{Scene, SceneError};

    fn options() -> RenderOptions {
        RenderOptions {
            width: 32,
            height: 32,
            scale: 0.125,
            tessellation: TessellationOptions::PREVIEW,
            epoch: 0.0,
        }
    }

    #[test]
    fn worker_matches_direct_rendering() {
        let mut scene = Scene::new();
        scene.add_primitive(Box::new(Disk::cylinder()));

        let mut ctx = RenderContext::new(options()).unwrap();
        let report = scene.render_all(&mut ctx);
        let direct = ctx.read_back();
        assert_eq!(report.rendered, 1);

        let shared = Arc::new(Mutex::new(scene));
        let worker = RenderWorker::spawn(Arc::clone(&shared), options()).unwrap();
        let output = worker.render().unwrap();
        assert_eq!(output.image, direct);
        assert_eq!(output.report, report);
        assert!(output.image.total_flux() > 0.0);
    }

    #[test]
    fn worker_sees_scatter_between_frames() {
        let shared = Arc::new(Mutex::new(Scene::new()));
        let worker = RenderWorker::spawn(Arc::clone(&shared), options()).unwrap();
        assert_eq!(worker.render().unwrap().image.total_flux(), 0.0);

        shared
            .lock()
            .unwrap()
            .add_primitive(Box::new(Disk::cylinder()));
        let small = worker.render().unwrap().image.total_flux();

        shared.lock().unwrap().scatter_parameters(&[5.0, 0.5]).unwrap();
        let large = worker.render().unwrap().image.total_flux();
        assert!(large > small);
    }

    #[test]
    fn scatter_and_render_is_one_step() {
        let mut scene = Scene::new();
        scene.add_primitive(Box::new(Disk::cylinder()));
        let shared = Arc::new(Mutex::new(scene));
        let worker = RenderWorker::spawn(Arc::clone(&shared), options()).unwrap();

        let frames = worker.scatter_and_render(&[1.0, 0.5], &[0.0]).unwrap();
        assert_eq!(frames.len(), 1);
        let small = frames[0].image.total_flux();
        assert_eq!(
            shared.lock().unwrap().get(0).unwrap().parameters().value_of("diameter"),
            Some(1.0)
        );

        let err = worker.scatter_and_render(&[1.0], &[0.0]).unwrap_err();
        assert!(matches!(
            err,
            RenderError::Scene(SceneError::BufferSizeMismatch { .. })
        ));
        assert_eq!(worker.render().unwrap().image.total_flux(), small);
    }

    #[test]
    fn concurrent_iterations_see_their_own_parameters() {
        let mut scene = Scene::new();
        scene.add_primitive(Box::new(Disk::cylinder()));
        let worker = RenderWorker::spawn(Arc::new(Mutex::new(scene)), options()).unwrap();

        let flux_for = |diameter: f64| {
            worker.scatter_and_render(&[diameter, 0.5], &[0.0]).unwrap()[0]
                .image
                .total_flux()
        };
        let expected = [(1.0, flux_for(1.0)), (3.0, flux_for(3.0))];
        assert!(expected[1].1 > expected[0].1);

        thread::scope(|s| {
            for (diameter, flux) in expected {
                let worker = &worker;
                s.spawn(move || {
                    for _ in 0..200 {
                        let frames = worker
                            .scatter_and_render(&[diameter, 0.5], &[0.0])
                            .unwrap();
                        assert_eq!(frames[0].image.total_flux(), flux);
                    }
                });
            }
        });
    }

    #[test]
    fn frames_follow_requested_epochs() {
        let mut disk = Disk::cylinder();
        let mut motion = LinearMotion::new();
        let vy = motion.parameters().index_of("vy").unwrap();
        motion.parameters_mut().set_value(vy, 0.5).unwrap();
        disk.set_placement(Box::new(motion));

        let mut scene = Scene::new();
        scene.add_primitive(Box::new(disk));
        let worker = RenderWorker::spawn(Arc::new(Mutex::new(scene)), options()).unwrap();

        let frames = worker.render_epochs(&[0.0, 4.0]).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].epoch, 4.0);
        assert_ne!(frames[0].image, frames[1].image);
        // the configured epoch is restored for plain renders
        assert_eq!(worker.render().unwrap().image, frames[0].image);
    }
}
