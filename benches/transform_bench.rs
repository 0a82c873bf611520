use criterion::{Criterion, criterion_group, criterion_main};
use octofhir_interop::*;
use std::hint::black_box;
use std::sync::Arc;

fn create_large_appointment() -> Appointment {
    let participant = (0..50)
        .map(|i| AppointmentParticipant {
            type_: vec![CodeableConcept::from_coding(
                Coding::new("urn:oid:2.16.840.1.113883.6.96", format!("role-{i}"))
                    .with_display(format!("Role {i}")),
            )],
            actor: Some(Reference::to(format!(
                "https://ehr.example.org/fhir/Practitioner/pr{i}"
            ))),
            status: Some("accepted".to_string()),
            ..Default::default()
        })
        .collect();

    Appointment {
        id: Some(Id::new("a1")),
        status: Some("BK".to_string()),
        start: Some("2024-05-01T09:00:00Z".to_string()),
        end: Some("2024-05-01T09:30:00Z".to_string()),
        slot: (0..20).map(|i| Reference::to(format!("Slot/s{i}"))).collect(),
        participant,
        ..Default::default()
    }
}

fn bench_normalize(c: &mut Criterion) {
    let appointment = create_large_appointment();
    let normalizer = Normalizer::new();

    c.bench_function("normalize_appointment", |b| {
        b.iter(|| black_box(normalizer.normalize(&appointment)))
    });

    let normalized = normalizer.normalize(&appointment).into_owned();
    c.bench_function("normalize_noop", |b| {
        b.iter(|| black_box(normalizer.normalize(&normalized)))
    });
}

fn bench_localize(c: &mut Criterion) {
    let appointment = create_large_appointment();
    let localizer = Localizer::new();

    c.bench_function("localize_appointment", |b| {
        b.iter(|| black_box(localizer.localize(&appointment, "abc")))
    });
}

fn bench_pipeline(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let store = MemoryObjectStore::new();
    runtime.block_on(async {
        store
            .put_json(
                "DataNormalizationRegistry.json",
                &serde_json::json!([{
                    "registry_uuid": "status-map",
                    "data_element": "Appointment.status",
                    "filename": "AppointmentStatus.json",
                    "version": "1",
                    "source_extension_url": "http://octofhir.io/fhir/StructureDefinition/tenant-sourceAppointmentStatus",
                    "resource_type": "Appointment",
                    "tenant_id": null
                }]),
            )
            .await
            .unwrap();
        store
            .put_json(
                "AppointmentStatus.json",
                &serde_json::json!({"group": [{
                    "source": "http://octofhir.io/fhir/CodeSystem/AppointmentStatus",
                    "target": "http://hl7.org/fhir/appointmentstatus",
                    "element": [{"code": "BK", "target": [{"code": "booked"}]}]
                }]}),
            )
            .await
            .unwrap();
    });

    let client = Arc::new(ConceptMapClient::new(
        Arc::new(store),
        ConceptMapConfig::default(),
    ));
    let pipeline = ProfilePipeline::new(AppointmentShape::new(), client, &PipelineConfig::default());
    let appointment = create_large_appointment();

    c.bench_function("appointment_pipeline", |b| {
        b.iter(|| {
            let outcome = runtime.block_on(pipeline.transform(&appointment, "abc", None));
            black_box(outcome)
        })
    });
}

criterion_group!(benches, bench_normalize, bench_localize, bench_pipeline);
criterion_main!(benches);
