//! Lazy, one-shot OCR availability.
//!
//! The OCR engine is expensive to build and may be impossible to build in a
//! given deployment (missing shared libraries, no tessdata). The probe
//! builds it on first use, caches the outcome, and can permanently disable
//! OCR when the engine breaks mid-run so later pages skip it entirely.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use super::ocr::{OcrEngine, OcrEngineFactory, OcrError, OcrPageResult, OCR_LANGUAGE};
use super::tessdata::TessdataResolver;
use super::types::PageImage;

/// Lifecycle of the OCR engine within one probe. Only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityState {
    Unprobed,
    Available,
    PermanentlyUnavailable,
}

type SharedEngine = Arc<Mutex<Box<dyn OcrEngine + Send>>>;

struct ProbeInner {
    state: CapabilityState,
    engine: Option<SharedEngine>,
}

pub struct OcrCapabilityProbe {
    factory: Box<dyn OcrEngineFactory>,
    resolver: TessdataResolver,
    explicit_tessdata: Option<PathBuf>,
    language: String,
    inner: Mutex<ProbeInner>,
}

impl OcrCapabilityProbe {
    /// `explicit_tessdata` takes priority over the resolver.
    pub fn new(
        factory: Box<dyn OcrEngineFactory>,
        resolver: TessdataResolver,
        explicit_tessdata: Option<PathBuf>,
    ) -> Self {
        Self {
            factory,
            resolver,
            explicit_tessdata,
            language: OCR_LANGUAGE.to_string(),
            inner: Mutex::new(ProbeInner {
                state: CapabilityState::Unprobed,
                engine: None,
            }),
        }
    }

    pub fn state(&self) -> CapabilityState {
        self.lock_inner().state
    }

    /// Handle to the OCR engine, building it on the first call.
    ///
    /// Returns `None` once OCR is known to be unavailable. Construction runs
    /// under the probe lock, so concurrent first callers build one engine.
    pub fn acquire(&self) -> Option<OcrHandle<'_>> {
        let mut inner = self.lock_inner();
        match inner.state {
            CapabilityState::Available => inner.engine.clone().map(|engine| OcrHandle {
                probe: self,
                engine,
            }),
            CapabilityState::PermanentlyUnavailable => None,
            CapabilityState::Unprobed => match self.build_engine() {
                Ok(engine) => {
                    let engine: SharedEngine = Arc::new(Mutex::new(engine));
                    inner.engine = Some(Arc::clone(&engine));
                    inner.state = CapabilityState::Available;
                    debug!(engine = self.factory.name(), "OCR engine available");
                    Some(OcrHandle { probe: self, engine })
                }
                Err(err) => {
                    inner.state = CapabilityState::PermanentlyUnavailable;
                    warn!(
                        engine = self.factory.name(),
                        error = %err,
                        "OCR unavailable; continuing with native text only"
                    );
                    None
                }
            },
        }
    }

    fn build_engine(&self) -> Result<Box<dyn OcrEngine + Send>, OcrError> {
        let tessdata = self
            .explicit_tessdata
            .clone()
            .or_else(|| self.resolver.resolve(&self.language));
        debug!(
            engine = self.factory.name(),
            tessdata = ?tessdata,
            language = %self.language,
            "Initializing OCR engine"
        );

        panic::catch_unwind(AssertUnwindSafe(|| {
            self.factory.create(tessdata.as_deref(), &self.language)
        }))
        .unwrap_or_else(|payload| Err(OcrError::Init(panic_message(&*payload))))
    }

    /// Move `Available` to `PermanentlyUnavailable` and drop the engine.
    fn disable(&self, cause: &OcrError) {
        let mut inner = self.lock_inner();
        if inner.state == CapabilityState::Available {
            inner.state = CapabilityState::PermanentlyUnavailable;
            inner.engine = None;
            warn!(
                engine = self.factory.name(),
                error = %cause,
                "OCR engine failed; disabling OCR for the rest of the run"
            );
        }
    }

    fn lock_inner(&self) -> MutexGuard<'_, ProbeInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Borrowed access to the probe's engine.
pub struct OcrHandle<'a> {
    probe: &'a OcrCapabilityProbe,
    engine: SharedEngine,
}

impl OcrHandle<'_> {
    /// Run recognition on one image. Blocks while another call holds the
    /// engine. Engine-fatal failures disable OCR on the owning probe.
    pub fn recognize(&self, image: &PageImage) -> Result<OcrPageResult, OcrError> {
        let result = self.recognize_locked(image);
        if let Err(err) = &result {
            if err.is_engine_fatal() {
                self.probe.disable(err);
            }
        }
        result
    }

    fn recognize_locked(&self, image: &PageImage) -> Result<OcrPageResult, OcrError> {
        let Ok(mut engine) = self.engine.lock() else {
            return Err(OcrError::EngineFailure("OCR engine lock poisoned".into()));
        };
        // Handles taken before a downgrade must not reach the engine.
        if self.probe.state() == CapabilityState::PermanentlyUnavailable {
            return Err(OcrError::Unavailable("OCR disabled after engine failure".into()));
        }

        panic::catch_unwind(AssertUnwindSafe(|| engine.recognize(image))).unwrap_or_else(
            |payload| {
                Err(OcrError::EngineFailure(format!(
                    "OCR engine panicked: {}",
                    panic_message(&*payload)
                )))
            },
        )
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::super::tessdata::Environment;
    use super::super::testing::{ok_text, ScriptedOcrFactory};
    use super::*;

    struct EmptyEnvironment;

    impl Environment for EmptyEnvironment {
        fn var(&self, _name: &str) -> Option<String> {
            None
        }

        fn is_file(&self, _path: &Path) -> bool {
            false
        }
    }

    struct ModelEverywhere;

    impl Environment for ModelEverywhere {
        fn var(&self, _name: &str) -> Option<String> {
            None
        }

        fn is_file(&self, _path: &Path) -> bool {
            true
        }
    }

    fn empty_resolver() -> TessdataResolver {
        TessdataResolver::new(Box::new(EmptyEnvironment), vec![])
    }

    fn probe(factory: &ScriptedOcrFactory) -> OcrCapabilityProbe {
        OcrCapabilityProbe::new(Box::new(factory.clone()), empty_resolver(), None)
    }

    fn image(page_index: usize) -> PageImage {
        PageImage::new(page_index, 1, 1, vec![])
    }

    #[test]
    fn starts_unprobed_without_building() {
        let factory = ScriptedOcrFactory::page_labels();
        let probe = probe(&factory);
        assert_eq!(probe.state(), CapabilityState::Unprobed);
        assert_eq!(factory.counters.creates(), 0);
    }

    #[test]
    fn first_acquire_builds_once_and_reuses() {
        let factory = ScriptedOcrFactory::page_labels();
        let probe = probe(&factory);

        let handle = probe.acquire().expect("engine should build");
        assert_eq!(probe.state(), CapabilityState::Available);
        assert_eq!(handle.recognize(&image(1)).unwrap().text, "OCR-2");

        for _ in 0..5 {
            assert!(probe.acquire().is_some());
        }
        assert_eq!(factory.counters.creates(), 1);
    }

    #[test]
    fn init_failure_is_terminal() {
        let factory = ScriptedOcrFactory::failing(OcrError::Init("libtesseract missing".into()));
        let probe = probe(&factory);

        assert!(probe.acquire().is_none());
        assert_eq!(probe.state(), CapabilityState::PermanentlyUnavailable);
        assert!(probe.acquire().is_none());
        assert!(probe.acquire().is_none());
        assert_eq!(factory.counters.creates(), 1);
    }

    #[test]
    fn unavailable_binding_is_terminal() {
        let probe = OcrCapabilityProbe::new(
            Box::new(super::super::ocr::UnavailableOcr),
            empty_resolver(),
            None,
        );
        assert!(probe.acquire().is_none());
        assert_eq!(probe.state(), CapabilityState::PermanentlyUnavailable);
    }

    #[test]
    fn recoverable_recognition_error_keeps_engine() {
        let factory = ScriptedOcrFactory::with_script(|image| {
            if image.page_index() == 0 {
                Err(OcrError::InvalidImage("truncated png".into()))
            } else {
                Ok(ok_text("fine"))
            }
        });
        let probe = probe(&factory);

        let handle = probe.acquire().unwrap();
        assert!(matches!(
            handle.recognize(&image(0)),
            Err(OcrError::InvalidImage(_))
        ));
        assert_eq!(probe.state(), CapabilityState::Available);
        assert_eq!(handle.recognize(&image(1)).unwrap().text, "fine");
        assert_eq!(probe.acquire().unwrap().recognize(&image(2)).unwrap().text, "fine");
        assert_eq!(factory.counters.creates(), 1);
    }

    #[test]
    fn engine_failure_downgrades_permanently() {
        let factory = ScriptedOcrFactory::with_script(|_| {
            Err(OcrError::EngineFailure("segfault in leptonica".into()))
        });
        let probe = probe(&factory);

        let handle = probe.acquire().unwrap();
        assert!(handle.recognize(&image(0)).is_err());
        assert_eq!(probe.state(), CapabilityState::PermanentlyUnavailable);
        assert!(probe.acquire().is_none());
        assert_eq!(factory.counters.creates(), 1);
        assert_eq!(factory.counters.recognitions(), 1);
    }

    #[test]
    fn engine_panic_downgrades_permanently() {
        let factory = ScriptedOcrFactory::with_script(|_| panic!("native abort"));
        let probe = probe(&factory);

        let err = probe.acquire().unwrap().recognize(&image(0)).unwrap_err();
        match err {
            OcrError::EngineFailure(msg) => assert!(msg.contains("native abort"), "{msg}"),
            other => panic!("expected EngineFailure, got {other:?}"),
        }
        assert_eq!(probe.state(), CapabilityState::PermanentlyUnavailable);
    }

    #[test]
    fn explicit_tessdata_wins_over_resolver() {
        let factory = ScriptedOcrFactory::page_labels();
        let resolver = TessdataResolver::new(Box::new(ModelEverywhere), vec!["/usr/share/tessdata".into()]);
        let probe = OcrCapabilityProbe::new(
            Box::new(factory.clone()),
            resolver,
            Some(PathBuf::from("/explicit/tessdata")),
        );
        probe.acquire().unwrap();
        let seen = factory.counters.tessdata_seen.lock().unwrap().clone();
        assert_eq!(seen, vec![Some(PathBuf::from("/explicit/tessdata"))]);
    }

    #[test]
    fn resolver_used_without_explicit_dir() {
        let factory = ScriptedOcrFactory::page_labels();
        let resolver = TessdataResolver::new(Box::new(ModelEverywhere), vec!["/usr/share/tessdata".into()]);
        let probe = OcrCapabilityProbe::new(Box::new(factory.clone()), resolver, None);
        probe.acquire().unwrap();
        let seen = factory.counters.tessdata_seen.lock().unwrap().clone();
        assert_eq!(seen, vec![Some(PathBuf::from("/usr/share/tessdata"))]);
    }

    #[test]
    fn engine_default_used_when_nothing_resolves() {
        let factory = ScriptedOcrFactory::page_labels();
        probe(&factory).acquire().unwrap();
        let seen = factory.counters.tessdata_seen.lock().unwrap().clone();
        assert_eq!(seen, vec![None]);
    }

    #[test]
    fn concurrent_first_use_builds_one_engine() {
        let factory = ScriptedOcrFactory::page_labels();
        let probe = probe(&factory);

        std::thread::scope(|scope| {
            for i in 0..8 {
                let probe = &probe;
                scope.spawn(move || {
                    let handle = probe.acquire().expect("engine should build");
                    let result = handle.recognize(&image(i)).unwrap();
                    assert_eq!(result.text, format!("OCR-{}", i + 1));
                });
            }
        });

        assert_eq!(factory.counters.creates(), 1);
        assert_eq!(factory.counters.recognitions(), 8);
        assert_eq!(probe.state(), CapabilityState::Available);
    }

    #[test]
    fn recognition_failure_keeps_engine() {
        let factory = ScriptedOcrFactory::with_script(|image| match image.page_index() {
            0 => Err(OcrError::Recognition("null text from engine".into())),
            _ => Ok(ok_text("second page")),
        });
        let probe = probe(&factory);

        let handle = probe.acquire().unwrap();
        assert!(matches!(
            handle.recognize(&image(0)),
            Err(OcrError::Recognition(_))
        ));
        assert_eq!(probe.state(), CapabilityState::Available);
        assert_eq!(handle.recognize(&image(1)).unwrap().text, "second page");
    }

    #[test]
    fn handle_taken_before_downgrade_skips_engine() {
        let factory = ScriptedOcrFactory::with_script(|image| match image.page_index() {
            0 => Err(OcrError::EngineFailure("runtime crashed".into())),
            _ => Ok(ok_text("late")),
        });
        let probe = probe(&factory);

        let first = probe.acquire().unwrap();
        let second = probe.acquire().unwrap();
        assert!(first.recognize(&image(0)).is_err());
        assert_eq!(probe.state(), CapabilityState::PermanentlyUnavailable);

        assert!(matches!(
            second.recognize(&image(1)),
            Err(OcrError::Unavailable(_))
        ));
        assert_eq!(factory.counters.recognitions(), 1);
        assert_eq!(probe.state(), CapabilityState::PermanentlyUnavailable);
    }

    #[test]
    fn panic_message_extracts_strings() {
        let boxed: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(&*boxed), "static");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(&*boxed), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(&*boxed), "unknown panic");
    }
}
