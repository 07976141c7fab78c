use std::io;

use finwire_core::{ChatRequest, ChatStreamChunk, Concept, ProviderRegistry, ProviderSettings};

use super::CommandOutcome;
use crate::cli::ChatArgs;
use crate::error::CliError;
use crate::output::stream_writer::NdjsonStreamWriter;

pub async fn run(args: &ChatArgs, settings: &ProviderSettings) -> Result<CommandOutcome, CliError> {
    let registry = ProviderRegistry::for_concept(Concept::Llm, settings);
    let provider = registry.first_provider()?;

    let mut request = ChatRequest::new(&args.prompt, &args.model);
    request.instructions = args.instructions.clone();
    request.previous_response_id = args.previous_response_id.clone();

    if !args.stream {
        let envelope = provider.chat_response(request, None).await;
        return CommandOutcome::envelope(&envelope);
    }

    let mut writer = NdjsonStreamWriter::new(io::stdout());
    let mut write_failure: Option<String> = None;
    let mut streamer = |chunk: &ChatStreamChunk| {
        if write_failure.is_some() {
            return;
        }
        let written = serde_json::to_value(chunk)
            .map_err(CliError::from)
            .and_then(|value| writer.emit_chunk(value));
        if let Err(error) = written {
            write_failure = Some(error.to_string());
        }
    };
    let envelope = provider.chat_response(request, Some(&mut streamer)).await;

    if let Some(message) = write_failure {
        return Err(CliError::Command(format!("failed to write stream: {message}")));
    }
    let failed = !envelope.is_success();
    let payload = serde_json::to_value(&envelope)?;
    if failed {
        writer.emit_error(payload)?;
    } else {
        writer.emit_end(payload)?;
    }
    Ok(CommandOutcome::streamed(failed))
}
