//! Servidor Axum com WebSocket para o etiquetador HMM, e avaliação pela linha de comando

mod server;

use std::error::Error;
use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use pos_core::{corpus, evaluation, HmmModel, PosTagger};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Etiquetador morfossintático com HMM e Viterbi")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sobe o servidor HTTP/WebSocket
    Serve(ServeArgs),
    /// Treina em um corpus e mede a acurácia em outro
    Evaluate(EvaluateArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[arg(long, default_value = "0.0.0.0:3000")]
    addr: SocketAddr,

    /// Sentenças de treino, uma por linha
    #[arg(long, requires = "train_tags")]
    train_sentences: Option<PathBuf>,

    /// Tags de treino, alinhadas linha a linha com as sentenças
    #[arg(long, requires = "train_sentences")]
    train_tags: Option<PathBuf>,

    /// Modelo JSON salvo por `evaluate --save`
    #[arg(long, conflicts_with = "train_sentences")]
    model: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct EvaluateArgs {
    #[arg(long)]
    train_sentences: PathBuf,
    #[arg(long)]
    train_tags: PathBuf,
    #[arg(long)]
    test_sentences: PathBuf,
    #[arg(long)]
    test_tags: PathBuf,

    /// Salva o modelo treinado em JSON
    #[arg(long)]
    save: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Evaluate(args) => evaluate(args),
    }
}

fn initial_tagger(args: &ServeArgs) -> Result<PosTagger, Box<dyn Error>> {
    if let Some(path) = &args.model {
        info!("Carregando modelo de {}", path.display());
        return Ok(PosTagger::with_model(HmmModel::load(path)?));
    }

    let pairs = match (&args.train_sentences, &args.train_tags) {
        (Some(sentences), Some(tags)) => corpus::load_pairs(sentences, tags)?,
        _ => {
            info!("Sem corpus de treino, usando o corpus de demonstração");
            corpus::demo_pairs()
        }
    };

    let mut tagger = PosTagger::new();
    tagger.train(&pairs);
    Ok(tagger)
}

async fn serve(args: ServeArgs) -> Result<(), Box<dyn Error>> {
    let state = server::AppState::new(initial_tagger(&args)?);
    let app = server::router(state);

    let listener = tokio::net::TcpListener::bind(args.addr).await?;
    info!("🚀 Servidor POS iniciado em http://{}", args.addr);
    axum::serve(listener, app).await?;
    Ok(())
}

fn evaluate(args: EvaluateArgs) -> Result<(), Box<dyn Error>> {
    let train_pairs = corpus::load_pairs(&args.train_sentences, &args.train_tags)?;
    let test_pairs = corpus::load_pairs(&args.test_sentences, &args.test_tags)?;

    let mut tagger = PosTagger::new();
    let report = tagger.train(&train_pairs);
    info!(
        "Treino: {} pares usados, {} ignorados, {} tags, vocabulário de {}",
        report.pairs_used, report.pairs_skipped, report.tags, report.vocabulary
    );

    if let (Some(path), Some(model)) = (&args.save, tagger.model()) {
        model.save(path)?;
        info!("Modelo salvo em {}", path.display());
    }

    let result = evaluation::evaluate(&tagger, &test_pairs);
    println!("{result}");
    Ok(())
}
