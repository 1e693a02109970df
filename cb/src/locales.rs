use crate::dispatch::Action;

const N: usize = Action::COUNT;

// Order matches the Action enum: cut, copy, paste, clear, show, edit,
// add, remove, note, swap, status, info, load, import, export, history,
// ignore, search, script, undo, redo.
const EN_NAMES: [&str; N] = [
    "cut", "copy", "paste", "clear", "show", "edit", "add", "remove", "note", "swap", "status",
    "info", "load", "import", "export", "history", "ignore", "search", "script", "undo", "redo",
];
const EN_SHORTCUTS: [&str; N] = [
    "ct", "cp", "p", "clr", "sh", "ed", "ad", "rm", "nt", "sw", "st", "in", "ld", "imp", "ex",
    "hs", "ig", "sr", "sc", "u", "r",
];
const EN_DOING: [&str; N] = [
    "Cutting",
    "Copying",
    "Pasting",
    "Clearing",
    "Showing",
    "Editing",
    "Adding",
    "Removing",
    "Noting",
    "Swapping",
    "Checking status",
    "Showing info",
    "Loading",
    "Importing",
    "Exporting",
    "Getting history",
    "Ignoring",
    "Searching",
    "Scripting",
    "Undoing",
    "Redoing",
];
const EN_DID: [&str; N] = [
    "Cut",
    "Copied",
    "Pasted",
    "Cleared",
    "Showed",
    "Edited",
    "Added",
    "Removed",
    "Noted",
    "Swapped",
    "Checked status",
    "Showed info",
    "Loaded",
    "Imported",
    "Exported",
    "Got history",
    "Ignored",
    "Searched",
    "Scripted",
    "Undid",
    "Redid",
];
const EN_DESCRIPTIONS: [&str; N] = [
    "Cut items into a clipboard.",
    "Copy items into a clipboard.",
    "Paste items from a clipboard.",
    "Clear a clipboard.",
    "Show the contents of a clipboard.",
    "Edit the text of a clipboard.",
    "Add items to a clipboard.",
    "Remove items from a clipboard.",
    "Add a note to a clipboard.",
    "Swap the contents of multiple clipboards.",
    "Check the status of all clipboards.",
    "Show info about a clipboard.",
    "Load a clipboard into other clipboards.",
    "Import clipboards from a file.",
    "Export clipboards to a file.",
    "Show the history of a clipboard.",
    "Ignore certain types of content in a clipboard.",
    "Search in clipboards.",
    "Attach a script to a clipboard.",
    "(reserved)",
    "(reserved)",
];

struct LocaleTable {
    names: [&'static str; N],
    shortcuts: [&'static str; N],
    doing: [&'static str; N],
    did: [&'static str; N],
}

const EN: LocaleTable = LocaleTable {
    names: EN_NAMES,
    shortcuts: EN_SHORTCUTS,
    doing: EN_DOING,
    did: EN_DID,
};

const ES: LocaleTable = LocaleTable {
    names: [
        "cortar", "copiar", "pegar", "quitar", "mostrar", "editar", "anadir", "sacar", "notar",
        "cambiar", "estado", "info", "cargar", "importar", "exportar", "historia", "ignorar",
        "buscar", "script", "deshacer", "rehacer",
    ],
    shortcuts: [
        "ct", "cp", "p", "qt", "ms", "ed", "ad", "rm", "nt", "cm", "st", "in", "cg", "im", "ex",
        "hs", "ig", "bs", "sc", "u", "r",
    ],
    doing: [
        "Cortando",
        "Copiando",
        "Pegando",
        "Quitando",
        "Mostrando",
        "Editando",
        "Anadiendo",
        "Sacando",
        "Notando",
        "Cambiando",
        "Verificando estado",
        "Mostrando info",
        "Cargando",
        "Importando",
        "Exportando",
        "Obteniendo historia",
        "Ignorando",
        "Buscando",
        "Ejecutando script",
        "Deshaciendo",
        "Rehaciendo",
    ],
    did: [
        "Corto",
        "Copio",
        "Pego",
        "Quito",
        "Mostro",
        "Edito",
        "Anadio",
        "Saco",
        "Noto",
        "Cambio",
        "Verifico estado",
        "Mostro info",
        "Cargo",
        "Importo",
        "Exporto",
        "Obtuvo historia",
        "Ignoro",
        "Busco",
        "Ejecuto script",
        "Deshizo",
        "Rehizo",
    ],
};

const PT: LocaleTable = LocaleTable {
    names: [
        "recortar", "copiar", "colar", "limpar", "mostrar", "editar", "adicionar", "remover",
        "notar", "trocar", "estado", "info", "carregar", "importar", "exportar", "historia",
        "ignorar", "buscar", "script", "desfazer", "refazer",
    ],
    shortcuts: [
        "rc", "cp", "cl", "lp", "ms", "ed", "ad", "rm", "nt", "tc", "st", "in", "cg", "im", "ex",
        "hs", "ig", "bs", "sc", "u", "r",
    ],
    doing: [
        "Recortando",
        "Copiando",
        "Colando",
        "Limpando",
        "Mostrando",
        "Editando",
        "Adicionando",
        "Removendo",
        "Notando",
        "Trocando",
        "Verificando estado",
        "Mostrando info",
        "Carregando",
        "Importando",
        "Exportando",
        "Obtendo historia",
        "Ignorando",
        "Buscando",
        "Executando script",
        "Desfazendo",
        "Refazendo",
    ],
    did: [
        "Recortou",
        "Copiou",
        "Colou",
        "Limpou",
        "Mostrou",
        "Editou",
        "Adicionou",
        "Removeu",
        "Notou",
        "Trocou",
        "Verificou estado",
        "Mostrou info",
        "Carregou",
        "Importou",
        "Exportou",
        "Obteve historia",
        "Ignorou",
        "Buscou",
        "Executou script",
        "Desfez",
        "Refez",
    ],
};

const TR: LocaleTable = LocaleTable {
    names: [
        "kes", "kopyala", "yapistir", "temizle", "goster", "duzenle", "ekle", "cikar", "not",
        "degistir", "durum", "bilgi", "yukle", "aktar", "disaaktar", "gecmis", "yoksay", "ara",
        "betik", "gerial", "yinele",
    ],
    shortcuts: [
        "ks", "kp", "y", "tm", "gs", "dz", "ek", "ck", "nt", "dg", "dr", "bl", "yk", "ak", "da",
        "gc", "ys", "ar", "bt", "g", "yn",
    ],
    doing: [
        "Kesiliyor",
        "Kopyalaniyor",
        "Yapistiriliyor",
        "Temizleniyor",
        "Gosteriliyor",
        "Duzenleniyor",
        "Ekleniyor",
        "Cikariliyor",
        "Not aliniyor",
        "Degistiriliyor",
        "Durum denetleniyor",
        "Bilgi gosteriliyor",
        "Yukleniyor",
        "Aktariliyor",
        "Disa aktariliyor",
        "Gecmis aliniyor",
        "Yoksayiliyor",
        "Araniyor",
        "Betik calisiyor",
        "Geri aliniyor",
        "Yineleniyor",
    ],
    did: [
        "Kesildi",
        "Kopyalandi",
        "Yapistirildi",
        "Temizlendi",
        "Gosterildi",
        "Duzenlendi",
        "Eklendi",
        "Cikarildi",
        "Not alindi",
        "Degistirildi",
        "Durum denetlendi",
        "Bilgi gosterildi",
        "Yuklendi",
        "Aktarildi",
        "Disa aktarildi",
        "Gecmis alindi",
        "Yoksayildi",
        "Arandi",
        "Betik calisti",
        "Geri alindi",
        "Yinelendi",
    ],
};

const FR: LocaleTable = LocaleTable {
    names: [
        "couper", "copier", "coller", "effacer", "afficher", "editer", "ajouter", "supprimer",
        "noter", "echanger", "statut", "info", "charger", "importer", "exporter", "historique",
        "ignorer", "chercher", "script", "annuler", "refaire",
    ],
    shortcuts: [
        "ct", "cp", "cl", "ef", "af", "ed", "aj", "sp", "nt", "ec", "st", "in", "ch", "im", "ex",
        "hs", "ig", "cr", "sc", "an", "rf",
    ],
    doing: [
        "Coupe",
        "Copie",
        "Collage",
        "Effacement",
        "Affichage",
        "Edition",
        "Ajout",
        "Suppression",
        "Annotation",
        "Echange",
        "Verification du statut",
        "Affichage des infos",
        "Chargement",
        "Importation",
        "Exportation",
        "Recuperation de l'historique",
        "Exclusion",
        "Recherche",
        "Execution du script",
        "Annulation",
        "Retablissement",
    ],
    did: [
        "Coupe",
        "Copie",
        "Colle",
        "Efface",
        "Affiche",
        "Edite",
        "Ajoute",
        "Supprime",
        "Note",
        "Echange",
        "Statut verifie",
        "Infos affichees",
        "Charge",
        "Importe",
        "Exporte",
        "Historique recupere",
        "Ignore",
        "Cherche",
        "Script execute",
        "Annule",
        "Refait",
    ],
};

const DE: LocaleTable = LocaleTable {
    names: [
        "ausschneiden",
        "kopieren",
        "einfuegen",
        "leeren",
        "zeigen",
        "bearbeiten",
        "hinzufuegen",
        "entfernen",
        "notiz",
        "wechseln",
        "status",
        "info",
        "laden",
        "importieren",
        "exportieren",
        "verlauf",
        "ignorieren",
        "suchen",
        "skript",
        "rueckgaengig",
        "wiederholen",
    ],
    shortcuts: [
        "as", "kp", "ef", "lr", "zg", "be", "hz", "en", "nz", "ws", "st", "in", "ld", "im", "ex",
        "vl", "ig", "su", "sk", "rg", "wh",
    ],
    doing: [
        "Schneidet aus",
        "Kopiert",
        "Fuegt ein",
        "Leert",
        "Zeigt",
        "Bearbeitet",
        "Fuegt hinzu",
        "Entfernt",
        "Notiert",
        "Wechselt",
        "Prueft Status",
        "Zeigt Info",
        "Laedt",
        "Importiert",
        "Exportiert",
        "Holt Verlauf",
        "Ignoriert",
        "Sucht",
        "Fuehrt Skript aus",
        "Macht rueckgaengig",
        "Wiederholt",
    ],
    did: [
        "Ausgeschnitten",
        "Kopiert",
        "Eingefuegt",
        "Geleert",
        "Gezeigt",
        "Bearbeitet",
        "Hinzugefuegt",
        "Entfernt",
        "Notiert",
        "Gewechselt",
        "Status geprueft",
        "Info gezeigt",
        "Geladen",
        "Importiert",
        "Exportiert",
        "Verlauf geholt",
        "Ignoriert",
        "Gesucht",
        "Skript ausgefuehrt",
        "Rueckgaengig gemacht",
        "Wiederholt",
    ],
};

/// The message catalogue the dispatcher and the reporting code consult.
/// Matching always accepts the English originals on top of the current
/// locale so scripts stay portable.
pub struct Catalog {
    pub locale: String,
    table: &'static LocaleTable,
}

impl Catalog {
    pub fn from_env() -> Self {
        let locale = std::env::var("CLIPBOARD_LOCALE")
            .or_else(|_| std::env::var("LC_ALL"))
            .or_else(|_| std::env::var("LANG"))
            .unwrap_or_default();
        Self::for_locale(&locale)
    }

    pub fn for_locale(locale: &str) -> Self {
        let table = match locale.get(..2).unwrap_or("") {
            "es" => &ES,
            "pt" => &PT,
            "tr" => &TR,
            "fr" => &FR,
            "de" => &DE,
            _ => &EN,
        };
        Self {
            locale: locale.to_string(),
            table,
        }
    }

    pub fn name(&self, action: Action) -> &'static str {
        self.table.names[action.index()]
    }

    pub fn shortcut(&self, action: Action) -> &'static str {
        self.table.shortcuts[action.index()]
    }

    pub fn doing(&self, action: Action) -> &'static str {
        self.table.doing[action.index()]
    }

    pub fn did(&self, action: Action) -> &'static str {
        self.table.did[action.index()]
    }

    pub fn description(&self, action: Action) -> &'static str {
        EN_DESCRIPTIONS[action.index()]
    }

    /// All spellings that select `action`: localized name and shortcut
    /// plus the English originals.
    pub fn spellings(&self, action: Action) -> [&'static str; 4] {
        [
            self.table.names[action.index()],
            self.table.shortcuts[action.index()],
            EN_NAMES[action.index()],
            EN_SHORTCUTS[action.index()],
        ]
    }

    pub fn matches(&self, action: Action, verb: &str) -> bool {
        self.spellings(action)
            .iter()
            .any(|s| s.eq_ignore_ascii_case(verb))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn english_is_the_default_table() {
        let c = Catalog::for_locale("");
        assert_eq!(c.name(Action::Copy), "copy");
        assert_eq!(c.shortcut(Action::Paste), "p");
        assert_eq!(c.did(Action::Cut), "Cut");
    }

    #[test]
    fn locale_prefix_selects_the_table() {
        assert_eq!(Catalog::for_locale("es_CO.UTF-8").name(Action::Paste), "pegar");
        assert_eq!(Catalog::for_locale("pt_BR").name(Action::Clear), "limpar");
        assert_eq!(Catalog::for_locale("de_DE").name(Action::History), "verlauf");
        assert_eq!(Catalog::for_locale("tr_TR").name(Action::Search), "ara");
        assert_eq!(Catalog::for_locale("fr_FR").name(Action::Swap), "echanger");
    }

    #[test]
    fn english_spellings_match_in_any_locale() {
        let c = Catalog::for_locale("tr_TR");
        assert!(c.matches(Action::Copy, "copy"));
        assert!(c.matches(Action::Copy, "kopyala"));
        assert!(c.matches(Action::Copy, "cp"));
        assert!(!c.matches(Action::Copy, "paste"));
    }
}
