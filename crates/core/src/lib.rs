pub mod shared {
    pub mod config;
    pub mod constants;
    pub mod frame;
    pub mod model_resolver;
    pub mod region;
}

pub mod imaging {
    pub mod domain {
        pub mod image_reader;
        pub mod image_writer;
    }
    pub mod infrastructure;
}

pub mod detection {
    pub mod domain {
        pub mod face_detector;
        pub mod face_region;
    }
    pub mod infrastructure;
}

pub mod features {
    pub mod domain {
        pub mod feature_extractor;
        pub mod feature_vector;
    }
}

pub mod classification {
    pub mod domain {
        pub mod age_bucketer;
        pub mod attribute_classifier;
        pub mod labels;
    }
    pub mod infrastructure;
}

pub mod registry {
    pub mod domain {
        pub mod artifact_store;
        pub mod model_artifact;
        pub mod model_registry;
        pub mod model_trainer;
    }
    pub mod infrastructure;
}

pub mod pipeline {
    pub mod classify_image_use_case;
    pub mod face_pipeline;
    pub mod infrastructure;
    pub mod pipeline_logger;
}
