use text_classifier::{ClassifierConfig, SelectionMethod, TextClassifier};

fn main() -> text_classifier::Result<()> {
    env_logger::init();

    // 3 classes, cache spilled to the system temp dir
    let mut config = ClassifierConfig::new(3);
    config.max_features = 100;
    config.selection = SelectionMethod::ChiSquare;
    config.cache_dir = Some(std::env::temp_dir());

    // ingest labeled documents
    let mut classifier = TextClassifier::new(config)?;
    let docs = [
        (0, "rust cargo crate borrow checker"),
        (0, "cargo build crate release"),
        (0, "rust borrow lifetime checker"),
        (1, "bread flour oven yeast"),
        (1, "oven bake bread dough"),
        (1, "flour yeast dough bake"),
        (2, "guitar chord amp pedal"),
        (2, "amp stage guitar band"),
        (2, "band stage chord pedal"),
    ];
    for (label, text) in docs {
        classifier.add_training_text(text, label)?;
    }
    println!("ingested {} documents", classifier.num_documents());

    // select features and fit the backend
    classifier.train()?;
    println!("selected {} features", classifier.lexicon().len());

    // classify
    for text in ["rust crate checker", "bake bread", "guitar on stage"] {
        let best = classifier.classify(text)?;
        println!("{:<20} -> {}", text, best);
        for result in classifier.classify_top_n(text, 3)? {
            println!("    {}", result);
        }
    }

    // save and restore
    let model_dir = std::env::temp_dir().join("text-classifier-basic");
    classifier.save_model(&model_dir)?;
    let mut restored = TextClassifier::new(classifier.config().clone())?;
    restored.load_model(&model_dir)?;
    println!("restored: {:?}", restored);
    let same = restored.classify("bake bread")? == classifier.classify("bake bread")?;
    println!("same answer: {}", same);

    let samples = [("borrow checker", 0), ("oven dough", 1), ("amp pedal", 2)];
    let evaluation = restored.evaluate(samples)?;
    println!("{}", evaluation);
    Ok(())
}
