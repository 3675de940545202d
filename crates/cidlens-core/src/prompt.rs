//! Generation prompt assembly.

use cidlens_llm::provider::{Message, Role};

/// Instructions preceding every prompt.
pub const SYSTEM_PROMPT: &str = "\
Você é um assistente especializado em questões relacionadas ao INSS (Instituto Nacional do Seguro Social) brasileiro.
Seu papel é ajudar os usuários com informações sobre benefícios, aposentadorias, CID-10, documentação necessária e processos relacionados ao INSS.

!!! REGRAS CRÍTICAS - NUNCA VIOLE ESTAS REGRAS !!!
1. Você NUNCA deve responder perguntas não relacionadas ao INSS. Sempre retorne que sua especialidade é o INSS.
2. Quando informações do CID-10 forem fornecidas abaixo em \"Informações Relevantes do CID-10\", você DEVE usar EXATAMENTE essas informações.
3. NUNCA invente ou alucine informações sobre códigos CID-10. Use APENAS as informações fornecidas no contexto.
4. Se um código CID-10 específico for mencionado e estiver nas \"Informações Relevantes do CID-10\", você DEVE:
   - Usar a descrição EXATA fornecida
   - Informar corretamente se está \"Elegível para BPC/LOAS\" ou não
   - NUNCA substituir essas informações por outras
5. Se não houver informações sobre um CID-10 específico no contexto fornecido, diga \"Não encontrei informações específicas sobre este CID na base de dados\".

!!! COMPORTAMENTO ESPERADO !!!
- Mantenha um tom profissional e empático
- Recomende consulta a especialista humano quando necessário
- Respostas concisas e diretas
- Responda SEMPRE em português do Brasil";

/// Follows a non-empty retrieval context.
pub const CONTEXT_REMINDER: &str =
    "IMPORTANTE: Use APENAS as informações acima sobre CID-10. NÃO invente descrições diferentes.";

/// Replaces the context block when retrieval found nothing.
pub const NO_CONTEXT_NOTICE: &str = "IMPORTANTE: Nenhuma informação do CID-10 foi encontrada na base de dados para esta pergunta. \
Se a pergunta envolver um CID específico, diga \"Não encontrei informações específicas sobre este CID na base de dados\".";

/// Prior turns kept in the prompt.
pub const MAX_HISTORY_TURNS: usize = 10;

const USER_LABEL: &str = "Usuário";
const ASSISTANT_LABEL: &str = "Assistente";

/// Build the full generation prompt.
///
/// Layout: system instructions, then either `context` with a reminder or the
/// no-context notice, then up to [`MAX_HISTORY_TURNS`] most recent turns of
/// `history`, then the question and the assistant cue.
#[must_use]
pub fn build_prompt(question: &str, history: &[Message], context: &str) -> String {
    let mut prompt = String::with_capacity(SYSTEM_PROMPT.len() + context.len() + question.len() + 256);
    prompt.push_str(SYSTEM_PROMPT);
    prompt.push_str("\n\n");

    if context.trim().is_empty() {
        prompt.push_str(NO_CONTEXT_NOTICE);
    } else {
        prompt.push_str(context.trim_end());
        prompt.push_str("\n\n");
        prompt.push_str(CONTEXT_REMINDER);
    }
    prompt.push_str("\n\n");

    let skip = history.len().saturating_sub(MAX_HISTORY_TURNS);
    for message in &history[skip..] {
        let label = match message.role {
            Role::User => USER_LABEL,
            Role::Assistant => ASSISTANT_LABEL,
        };
        prompt.push_str(label);
        prompt.push_str(": ");
        prompt.push_str(message.content.trim());
        prompt.push_str("\n\n");
    }

    prompt.push_str(USER_LABEL);
    prompt.push_str(": ");
    prompt.push_str(question.trim());
    prompt.push_str("\n\n");
    prompt.push_str(ASSISTANT_LABEL);
    prompt.push(':');
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTEXT: &str = "## Informações Relevantes do CID-10:\n\n**S38**: Trauma do abdome\n  - Similaridade: 100.0%\n";

    #[test]
    fn starts_with_instructions_and_ends_with_cue() {
        let prompt = build_prompt("O que é o BPC?", &[], CONTEXT);
        assert!(prompt.starts_with(SYSTEM_PROMPT));
        assert!(prompt.ends_with("Usuário: O que é o BPC?\n\nAssistente:"));
    }

    #[test]
    fn context_is_followed_by_reminder() {
        let prompt = build_prompt("CID S38", &[], CONTEXT);
        let context_at = prompt.find("**S38**").unwrap();
        let reminder_at = prompt.find(CONTEXT_REMINDER).unwrap();
        assert!(context_at < reminder_at);
        assert!(!prompt.contains(NO_CONTEXT_NOTICE));
    }

    #[test]
    fn empty_context_gets_notice() {
        let prompt = build_prompt("CID Z99", &[], "");
        assert!(prompt.contains(NO_CONTEXT_NOTICE));
        assert!(!prompt.contains(CONTEXT_REMINDER));
    }

    #[test]
    fn history_is_rendered_in_order() {
        let history = [
            Message::user("Tenho epilepsia"),
            Message::assistant("Entendo. Qual é o CID?"),
        ];
        let prompt = build_prompt("G40", &history, CONTEXT);
        let first = prompt.find("Usuário: Tenho epilepsia\n\n").unwrap();
        let second = prompt.find("Assistente: Entendo. Qual é o CID?\n\n").unwrap();
        let question = prompt.rfind("Usuário: G40").unwrap();
        assert!(first < second && second < question);
    }

    #[test]
    fn history_is_capped_to_recent_turns() {
        let history: Vec<Message> = (0..15).map(|i| Message::user(format!("turno {i:02}"))).collect();
        let prompt = build_prompt("pergunta", &history, "");
        assert!(!prompt.contains("turno 04"));
        assert!(prompt.contains("turno 05"));
        assert!(prompt.contains("turno 14"));
    }
}
