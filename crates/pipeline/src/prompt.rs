//! System preamble synthesis
//!
//! The preamble is rebuilt from the company's current business-logic script
//! on every turn and never persisted, so a long-running call always reflects
//! live edits to the company configuration.

/// Build the instructional preamble for one generation call.
pub fn preamble(business_logic: &str) -> String {
    format!(
        "Eres un asistente de voz profesional y amigable para una empresa.\n\n\
         Lógica del negocio y cómo debes actuar:\n{business_logic}\n\n\
         Responde de manera natural, concisa y útil. Tu respuesta debe ser \
         apropiada para ser convertida a voz. Mantén el contexto de la \
         conversación anterior."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embeds_business_logic() {
        let text = preamble("Vendemos bicicletas. Horario: 9 a 18.");
        assert!(text.contains("Vendemos bicicletas"));
        assert!(text.starts_with("Eres un asistente de voz"));
    }
}
