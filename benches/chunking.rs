use criterion::{Criterion, criterion_group, criterion_main};
use health_rag::embeddings::{ChunkingConfig, split_documents, split_text};
use health_rag::ingest::{Document, DocumentMetadata};
use std::hint::black_box;
use std::path::PathBuf;

fn sample_article() -> String {
    let paragraph = "Influenza is a contagious respiratory illness caused by influenza viruses. \
        It can cause mild to severe illness. Symptoms usually come on suddenly and include fever, \
        cough, sore throat, muscle aches and fatigue. Most people recover within a week, \
        but rest and fluids help the body heal.";
    (0..200)
        .map(|i| format!("Section {}\n{}", i, paragraph))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let article = sample_article();
    let config = ChunkingConfig::default();
    let documents: Vec<Document> = (0..20)
        .map(|i| Document {
            text: article.clone(),
            metadata: DocumentMetadata {
                source_path: PathBuf::from(format!("article-{}.md", i)),
                category: None,
            },
        })
        .collect();

    c.bench_function("split_text", |b| {
        b.iter(|| split_text(black_box(&article), black_box(&config)))
    });
    c.bench_function("split_documents", |b| {
        b.iter(|| split_documents(black_box(&documents), black_box(&config)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
