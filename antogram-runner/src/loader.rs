use antogram_config::FieldSettings;
use antogram_core::{Canvas, PreparedField, SimulationMode};
use antogram_field::{ContentDescriptor, FieldBuilder, FieldError, FieldSource};
use crossbeam_channel::{bounded, Receiver};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::thread;

/// What the loader thread needs to build one field.
pub struct FieldRequest {
    pub descriptor: ContentDescriptor,
    pub settings: FieldSettings,
    pub canvas: Canvas,
    pub mode: SimulationMode,
    pub seed: Option<u64>,
}

/// Fetches and builds the field on its own thread; the tick loop polls the
/// returned channel and only ever sees a complete field or an error.
pub fn spawn_loader<S>(request: FieldRequest, source: S) -> Receiver<Result<PreparedField, FieldError>>
where
    S: FieldSource + 'static,
{
    let (tx, rx) = bounded(1);
    thread::spawn(move || {
        let result = build_field(&request, &source);
        if tx.send(result).is_err() {
            debug!("Tick loop stopped before the field was ready");
        }
    });
    rx
}

pub fn build_field<S: FieldSource + ?Sized>(
    request: &FieldRequest,
    source: &S,
) -> Result<PreparedField, FieldError> {
    info!(
        "Loading {} field ({} chars)",
        request.descriptor.kind(),
        request.descriptor.content().chars().count()
    );
    let content = source.fetch(&request.descriptor)?;
    let mut rng = match request.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let builder = FieldBuilder::new(request.settings.clone(), request.canvas);
    Ok(builder.build(&content, request.mode, &mut rng))
}

#[cfg(test)]
mod tests {
    use super::*;
    use antogram_field::LocalFieldSource;
    use std::time::Duration;

    fn request(descriptor: ContentDescriptor) -> FieldRequest {
        FieldRequest {
            descriptor,
            settings: FieldSettings::default(),
            canvas: Canvas::new(200.0, 120.0),
            mode: SimulationMode::Forward,
            seed: Some(9),
        }
    }

    #[test]
    fn loader_hands_over_a_complete_field() {
        let rx = spawn_loader(request(ContentDescriptor::Text("OK".into())), LocalFieldSource::new());
        let field = rx.recv_timeout(Duration::from_secs(10)).unwrap().unwrap();
        assert!(!field.is_empty());
        assert_eq!(field.bits.len(), field.jobs.len());
    }

    #[test]
    fn loader_reports_fetch_failures() {
        let rx = spawn_loader(
            request(ContentDescriptor::Image("/no/such/picture.png".into())),
            LocalFieldSource::new(),
        );
        let result = rx.recv_timeout(Duration::from_secs(10)).unwrap();
        assert!(matches!(result, Err(FieldError::Io(_))));
    }
}
