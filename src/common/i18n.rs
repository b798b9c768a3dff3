// src/common/i18n.rs

use std::collections::HashMap;

use anyhow::Context;

const DEFAULT_LANG: &str = "en";

// Traduções embutidas no binário. A chave do arquivo é o idioma primário (ex: "pt").
const EMBEDDED_LOCALES: &[(&str, &str)] = &[
    ("en", include_str!("../../locales/en.json")),
    ("pt", include_str!("../../locales/pt.json")),
];

/// Mensagens traduzidas, indexadas por idioma e chave.
#[derive(Debug, Clone, Default)]
pub struct I18nStore {
    messages: HashMap<String, HashMap<String, String>>,
}

impl I18nStore {
    pub fn embedded() -> anyhow::Result<Self> {
        let mut messages = HashMap::new();
        for (lang, raw) in EMBEDDED_LOCALES {
            let table: HashMap<String, String> = serde_json::from_str(raw)
                .with_context(|| format!("Falha ao ler locales/{}.json", lang))?;
            messages.insert(lang.to_string(), table);
        }
        Ok(Self { messages })
    }

    // Busca no idioma pedido, depois em inglês, e por fim devolve a própria chave.
    // Placeholders no formato {nome} são substituídos pelos parâmetros.
    pub fn translate(&self, lang: &str, key: &str, params: &[(&str, &str)]) -> String {
        let template = self
            .lookup(lang, key)
            .or_else(|| self.lookup(DEFAULT_LANG, key))
            .unwrap_or(key);

        params.iter().fold(template.to_string(), |text, (name, value)| {
            text.replace(&format!("{{{}}}", name), value)
        })
    }

    fn lookup(&self, lang: &str, key: &str) -> Option<&str> {
        self.messages.get(lang)?.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_english_then_to_the_key() {
        let store = I18nStore::embedded().unwrap();

        assert_eq!(store.translate("de", "invalid_token", &[]), store.translate("en", "invalid_token", &[]));
        assert_eq!(store.translate("pt", "chave_inexistente", &[]), "chave_inexistente");
    }

    #[test]
    fn substitutes_named_params() {
        let store = I18nStore::embedded().unwrap();

        let text = store.translate("en", "notice_accepted_driver_body", &[("name", "Bruna")]);
        assert_eq!(text, "You've accepted Bruna's request to join the ride.");
    }

    #[test]
    fn every_english_key_has_a_portuguese_translation() {
        let store = I18nStore::embedded().unwrap();
        let en = &store.messages["en"];
        let pt = &store.messages["pt"];

        let missing: Vec<&String> = en.keys().filter(|k| !pt.contains_key(*k)).collect();
        assert!(missing.is_empty(), "faltando em pt: {:?}", missing);
    }
}
