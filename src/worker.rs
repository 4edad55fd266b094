//! Background detection.
//!
//! A [`DetectionWorker`] runs the detector on its own thread so the owner of
//! a [`CaptureSession`](crate::CaptureSession) can keep handling input while
//! the session sits in `Detecting`. Jobs are processed in submission order
//! and every result carries the [`JobId`] returned by `submit`, so the result
//! of a cancelled detection is never mistaken for a later one.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, TryRecvError};
use std::thread;

use crate::capture::ImageArtifact;
use crate::detector::{DetectorHandle, FaceObservation};
use crate::error::{Error, Result};

/// Identifies one submitted detection. Ids increase with every submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job#{}", self.0)
    }
}

/// A finished detection and the job it belongs to.
pub type JobResult = (JobId, Result<Option<FaceObservation>>);

enum Message {
    Detect(JobId, ImageArtifact),
    Terminate,
}

pub struct DetectionWorker {
    sender: mpsc::Sender<Message>,
    receiver: mpsc::Receiver<JobResult>,
    next_id: AtomicU64,
    thread: Option<thread::JoinHandle<()>>,
}

fn stopped() -> Error {
    Error::Detector("detection worker has stopped".into())
}

impl DetectionWorker {
    pub fn spawn(name: &str, detector: DetectorHandle) -> Result<Self> {
        let (sender, jobs) = mpsc::channel();
        let (results, receiver) = mpsc::channel();
        let thread = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                while let Ok(Message::Detect(id, image)) = jobs.recv() {
                    if results.send((id, detector.detect_first_face(&image))).is_err() {
                        break;
                    }
                }
            })?;

        Ok(Self {
            sender,
            receiver,
            next_id: AtomicU64::new(0),
            thread: Some(thread),
        })
    }

    /// Queue a frame for detection.
    pub fn submit(&self, image: ImageArtifact) -> Result<JobId> {
        let id = JobId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.sender
            .send(Message::Detect(id, image))
            .map_err(|_| stopped())?;
        log::debug!("submitted detection {}", id);
        Ok(id)
    }

    /// Block until the next detection finishes, whichever job it is.
    pub fn recv(&self) -> Result<JobResult> {
        self.receiver.recv().map_err(|_| stopped())
    }

    /// Block until `job` finishes. Results of earlier jobs still in flight,
    /// such as cancelled detections, are discarded.
    pub fn recv_job(&self, job: JobId) -> Result<Option<FaceObservation>> {
        loop {
            let (id, result) = self.recv()?;
            if id == job {
                return result;
            }
            if id > job {
                return Err(Error::Detector(format!(
                    "result for {} was already taken",
                    job
                )));
            }
            log::debug!("discarding stale result of {}", id);
        }
    }

    /// The next finished detection, if one is ready.
    pub fn try_recv(&self) -> Result<Option<JobResult>> {
        match self.receiver.try_recv() {
            Ok(result) => Ok(Some(result)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(stopped()),
        }
    }
}

impl Drop for DetectionWorker {
    fn drop(&mut self) {
        let _ = self.sender.send(Message::Terminate);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("detection worker panicked");
            }
        }
        log::debug!("detection worker shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::{DetectorKind, LandmarkDetector, RecordedDetector};
    use crate::types::BoundingBox;
    use crate::{CaptureSession, Phase};

    fn loaded_handle(faces: Vec<FaceObservation>) -> DetectorHandle {
        let handle = DetectorHandle::new(RecordedDetector::new(DetectorKind::BoundingBox, faces));
        handle.load().unwrap();
        handle
    }

    /// Reports a face box whose width is the frame's first byte.
    struct EchoDetector;

    impl LandmarkDetector for EchoDetector {
        fn kind(&self) -> DetectorKind {
            DetectorKind::BoundingBox
        }

        fn detect_first_face(&self, image: &ImageArtifact) -> Result<Option<FaceObservation>> {
            Ok(image.data().first().map(|&width| {
                FaceObservation::BoundingBox(BoundingBox::new(0.0, 0.0, width as f32, 100.0))
            }))
        }
    }

    fn face_width(face: Option<FaceObservation>) -> f32 {
        match face {
            Some(FaceObservation::BoundingBox(bbox)) => bbox.width,
            other => panic!("expected a face box, got {:?}", other),
        }
    }

    #[test]
    fn detects_in_background() {
        let face = FaceObservation::BoundingBox(BoundingBox::new(0.0, 0.0, 80.0, 120.0));
        let worker = DetectionWorker::spawn("detect-test", loaded_handle(vec![face.clone()])).unwrap();

        let first = worker.submit(ImageArtifact::new(vec![1])).unwrap();
        let second = worker.submit(ImageArtifact::new(vec![2])).unwrap();
        assert!(first < second);

        let (id, result) = worker.recv().unwrap();
        assert_eq!(id, first);
        assert_eq!(result.unwrap(), Some(face.clone()));
        assert_eq!(worker.recv_job(second).unwrap(), Some(face));
    }

    #[test]
    fn try_recv_without_jobs() {
        let worker = DetectionWorker::spawn("detect-idle", loaded_handle(Vec::new())).unwrap();
        assert!(worker.try_recv().unwrap().is_none());
    }

    struct FailingDetector;

    impl LandmarkDetector for FailingDetector {
        fn kind(&self) -> DetectorKind {
            DetectorKind::Landmarks68
        }

        fn detect_first_face(&self, _image: &ImageArtifact) -> Result<Option<FaceObservation>> {
            Err(Error::Detector("no backend".into()))
        }
    }

    #[test]
    fn detector_errors_are_forwarded() {
        let worker = DetectionWorker::spawn("detect-fail", DetectorHandle::new(FailingDetector)).unwrap();
        let job = worker.submit(ImageArtifact::new(vec![1])).unwrap();
        assert!(matches!(worker.recv_job(job), Err(Error::Detector(_))));
    }

    #[test]
    fn taken_result_is_an_error() {
        let worker = DetectionWorker::spawn("detect-taken", DetectorHandle::new(EchoDetector)).unwrap();
        let first = worker.submit(ImageArtifact::new(vec![1])).unwrap();
        let second = worker.submit(ImageArtifact::new(vec![2])).unwrap();

        assert_eq!(face_width(worker.recv_job(second).unwrap()), 2.0);
        assert!(matches!(worker.recv_job(first), Err(Error::Detector(_))));
    }

    #[test]
    fn session_waits_in_detecting() {
        let face = FaceObservation::BoundingBox(BoundingBox::new(0.0, 0.0, 100.0, 100.0));
        let handle = DetectorHandle::new(RecordedDetector::new(DetectorKind::BoundingBox, vec![face]));
        let mut session = CaptureSession::new(handle.clone());
        session.load_model().unwrap();

        let worker = DetectionWorker::spawn("detect-session", handle).unwrap();
        session.capture(ImageArtifact::new(vec![1])).unwrap();
        let job = worker.submit(session.begin_detection().unwrap()).unwrap();

        // Still detecting: a second capture must not start another detection.
        assert!(session.capture(ImageArtifact::new(vec![2])).is_err());
        assert_eq!(session.phase(), Phase::Detecting);

        let score = session.complete_detection(worker.recv_job(job)).unwrap();
        assert!(score.is_some());
        assert_eq!(session.phase(), Phase::Scored);
    }

    #[test]
    fn cancelled_result_does_not_reach_next_detection() {
        let handle = DetectorHandle::new(EchoDetector);
        let mut session = CaptureSession::new(handle.clone());
        session.load_model().unwrap();
        let worker = DetectionWorker::spawn("detect-cancel", handle).unwrap();

        session.capture(ImageArtifact::new(vec![10])).unwrap();
        let cancelled = worker.submit(session.begin_detection().unwrap()).unwrap();
        session.cancel_detection().unwrap();
        assert_eq!(session.phase(), Phase::Ready);

        session.capture(ImageArtifact::new(vec![200])).unwrap();
        let current = worker.submit(session.begin_detection().unwrap()).unwrap();
        assert_ne!(cancelled, current);

        let face = worker.recv_job(current).unwrap();
        assert_eq!(face_width(face.clone()), 200.0);

        session.complete_detection(Ok(face)).unwrap();
        assert_eq!(session.phase(), Phase::Scored);
        assert!(worker.try_recv().unwrap().is_none());
    }
}
